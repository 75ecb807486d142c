//! Storage backends for the octree tables.
//!
//! The construction routines operate on plain slices. Where the tables live is chosen
//! through an [Accelerator], which names the vector type used for every table.

/// A resizable contiguous buffer.
pub trait DeviceVector<T>: Default + Send + Sync {
    /// Resize to `len` elements, new elements take the default value.
    fn resize(&mut self, len: usize);

    /// Number of elements.
    fn len(&self) -> usize;

    /// Whether the buffer holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View the buffer.
    fn as_slice(&self) -> &[T];

    /// Mutably view the buffer.
    fn as_mut_slice(&mut self) -> &mut [T];

    /// Copy the buffer into host memory.
    fn to_host(&self) -> Vec<T>;
}

impl<T: Copy + Default + Send + Sync> DeviceVector<T> for Vec<T> {
    fn resize(&mut self, len: usize) {
        Vec::resize(self, len, T::default());
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn as_slice(&self) -> &[T] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }

    fn to_host(&self) -> Vec<T> {
        self.clone()
    }
}

/// Hardware the octree tables reside on.
pub trait Accelerator {
    /// Vector type used for all tables.
    type Vector<T: Copy + Default + Send + Sync>: DeviceVector<T>;
}

/// Host memory, tables are `Vec`s.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cpu;

impl Accelerator for Cpu {
    type Vector<T: Copy + Default + Send + Sync> = Vec<T>;
}

/// A pointer that can be shared between rayon workers.
///
/// Only used for scattered writes whose targets are provably disjoint across workers.
#[derive(Clone, Debug, Copy)]
pub(crate) struct SendPtrMut<T> {
    pub(crate) raw: *mut T,
}

unsafe impl<T> Sync for SendPtrMut<T> {}
unsafe impl<T> Send for SendPtrMut<T> {}

impl<T> SendPtrMut<T> {
    pub(crate) fn new(slice: &mut [T]) -> Self {
        SendPtrMut {
            raw: slice.as_mut_ptr(),
        }
    }

    /// Write `value` at `index`.
    ///
    /// # Safety
    /// `index` must be in bounds of the slice the pointer was created from, the slice must
    /// outlive all writes, and no other thread may access `index` concurrently.
    pub(crate) unsafe fn write(&self, index: usize, value: T) {
        *self.raw.add(index) = value;
    }
}
