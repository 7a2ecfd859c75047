use core::marker::PhantomData;
use std::fmt;
use std::hash::{Hash, Hasher};

pub mod definition;
pub mod location;
pub mod member;
pub mod names;
pub mod runtime;
pub mod system;
pub mod types;

pub use location::SourceLocation;
pub use member::{FieldRef, MethodRef};
pub use system::{TypeSystem, TypeSystemBuilder};
pub use types::{PrimitiveType, Type, TypeRef};

/// Stable index into a [`Store`].
///
/// Ids stay valid for the lifetime of the store: slots are overwritten in place,
/// never removed.
#[repr(transparent)]
pub struct Id<T>(pub u32, PhantomData<fn() -> T>);

impl<T> Id<T> {
  pub const fn new(index: u32) -> Self {
    Id(index, PhantomData)
  }

  #[inline]
  pub fn index(&self) -> usize {
    self.0 as usize
  }
}

impl<T> Clone for Id<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
  fn eq(
    &self,
    other: &Self,
  ) -> bool {
    self.0 == other.0
  }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
  fn partial_cmp(
    &self,
    other: &Self,
  ) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl<T> Ord for Id<T> {
  fn cmp(
    &self,
    other: &Self,
  ) -> std::cmp::Ordering {
    self.0.cmp(&other.0)
  }
}

impl<T> Hash for Id<T> {
  fn hash<H: Hasher>(
    &self,
    state: &mut H,
  ) {
    self.0.hash(state);
  }
}

impl<T> fmt::Debug for Id<T> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

#[derive(Debug, Clone)]
pub struct Store<T> {
  data: Vec<T>,
}

impl<T> Default for Store<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Store<T> {
  pub fn new() -> Self {
    Self { data: Vec::new() }
  }

  pub fn alloc(
    &mut self,
    v: T,
  ) -> Id<T> {
    let id = Id::new(self.data.len() as u32);
    self.data.push(v);
    id
  }

  pub fn get(
    &self,
    id: &Id<T>,
  ) -> &T {
    &self.data[id.index()]
  }

  pub fn get_mut(
    &mut self,
    id: Id<T>,
  ) -> &mut T {
    &mut self.data[id.index()]
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
    self.data.iter().enumerate().map(|(i, v)| (Id::new(i as u32), v))
  }
}
