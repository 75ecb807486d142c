//! Thread tools

use rayon::ThreadPoolBuilder;

use crate::types::Result;

/// Create a pool of `num_threads` workers for [OctreeData::update_in](crate::octree::OctreeData::update_in).
pub fn create_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    Ok(ThreadPoolBuilder::new().num_threads(num_threads).build()?)
}
