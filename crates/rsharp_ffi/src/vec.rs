//! Native vectors of value types
//!
//! Elements go in as boxed values and are consumed on insertion. Element
//! pointers handed out by `get` borrow from the vector buffer and are
//! invalidated by any call that grows it.

#![allow(non_snake_case)]

use crate::boxes::BoxValue;
use rsharp_core::{NativeType, Ptr, Result};

/// A vector owned by the native side
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeVec<T> {
    inner: Vec<T>,
}

impl<T> NativeVec<T> {
    pub fn as_slice(&self) -> &[T] {
        &self.inner
    }
}

pub type NativeVecI32 = NativeVec<i32>;

/// A boxable value that also has exported vector functions
pub trait VecValue: BoxValue {
    /// Schema name, e.g. `RVec_I32`
    const VEC_SCHEMA: &'static str;

    fn vec_new() -> *mut NativeVec<Self>;

    /// # Safety
    /// `vec` must be null or come from `vec_new`, and not have been freed.
    unsafe fn vec_drop(vec: *mut NativeVec<Self>);

    /// # Safety
    /// `vec` must point at a live vector.
    unsafe fn vec_len(vec: *const NativeVec<Self>) -> usize;

    /// # Safety
    /// `vec` must point at a live vector.
    unsafe fn vec_get(vec: *const NativeVec<Self>, idx: usize) -> *const Self;

    /// # Safety
    /// `vec` must point at a live vector that may be written.
    unsafe fn vec_get_mut(vec: *mut NativeVec<Self>, idx: usize) -> *mut Self;

    /// # Safety
    /// `vec` must point at a live vector that may be written; `item` must be
    /// null or a box from `box_new`, and is consumed.
    unsafe fn vec_set(vec: *mut NativeVec<Self>, idx: usize, item: *mut Self) -> bool;

    /// # Safety
    /// See [`VecValue::vec_set`].
    unsafe fn vec_push(vec: *mut NativeVec<Self>, item: *mut Self);
}

impl<T: VecValue> NativeType for NativeVec<T> {
    const NAME: &'static str = T::VEC_SCHEMA;

    unsafe fn drop_native(ptr: Ptr<Self>) -> Result<()> {
        T::vec_drop(ptr.as_ptr());
        Ok(())
    }
}

/// Take the value out of a boxed item, freeing the box
unsafe fn take_item<T>(item: *mut T) -> Option<T> {
    if item.is_null() {
        None
    } else {
        Some(*Box::from_raw(item))
    }
}

macro_rules! vec_values {
    ($($t:ty => $schema:literal {
        $new:ident, $drop:ident, $len:ident, $get:ident, $get_mut:ident, $set:ident, $push:ident
    })+) => {
        $(
            #[no_mangle]
            pub extern "C" fn $new() -> *mut NativeVec<$t> {
                Box::into_raw(Box::default())
            }

            /// # Safety
            /// `vec` must be null or come from the matching `new`, and not have been freed.
            #[no_mangle]
            pub unsafe extern "C" fn $drop(vec: *mut NativeVec<$t>) {
                if !vec.is_null() {
                    drop(Box::from_raw(vec));
                }
            }

            /// # Safety
            /// `vec` must point at a live vector.
            #[no_mangle]
            pub unsafe extern "C" fn $len(vec: *const NativeVec<$t>) -> usize {
                (&(*vec).inner).len()
            }

            /// Borrow an element. Null when `idx` is out of range.
            ///
            /// # Safety
            /// `vec` must point at a live vector.
            #[no_mangle]
            pub unsafe extern "C" fn $get(vec: *const NativeVec<$t>, idx: usize) -> *const $t {
                match (&(*vec).inner).get(idx) {
                    Some(elem) => elem as *const $t,
                    None => core::ptr::null(),
                }
            }

            /// Mutably borrow an element. Null when `idx` is out of range.
            ///
            /// # Safety
            /// `vec` must point at a live vector that may be written.
            #[no_mangle]
            pub unsafe extern "C" fn $get_mut(vec: *mut NativeVec<$t>, idx: usize) -> *mut $t {
                match (&mut (*vec).inner).get_mut(idx) {
                    Some(elem) => elem as *mut $t,
                    None => core::ptr::null_mut(),
                }
            }

            /// Overwrite an element with a boxed value, consuming the box.
            /// Returns false when `idx` is out of range or `item` is null.
            ///
            /// # Safety
            /// `vec` must point at a live vector that may be written. `item` must be
            /// null or come from the matching box constructor; it is freed either way.
            #[no_mangle]
            pub unsafe extern "C" fn $set(vec: *mut NativeVec<$t>, idx: usize, item: *mut $t) -> bool {
                let Some(value) = take_item(item) else {
                    return false;
                };

                match (&mut (*vec).inner).get_mut(idx) {
                    Some(slot) => {
                        *slot = value;
                        true
                    }
                    None => false,
                }
            }

            /// Append a boxed value, consuming the box
            ///
            /// # Safety
            /// `vec` must point at a live vector that may be written. `item` must be
            /// null or come from the matching box constructor.
            #[no_mangle]
            pub unsafe extern "C" fn $push(vec: *mut NativeVec<$t>, item: *mut $t) {
                if let Some(value) = take_item(item) {
                    (&mut (*vec).inner).push(value);
                }
            }

            impl VecValue for $t {
                const VEC_SCHEMA: &'static str = $schema;

                fn vec_new() -> *mut NativeVec<Self> {
                    $new()
                }

                unsafe fn vec_drop(vec: *mut NativeVec<Self>) {
                    $drop(vec)
                }

                unsafe fn vec_len(vec: *const NativeVec<Self>) -> usize {
                    $len(vec)
                }

                unsafe fn vec_get(vec: *const NativeVec<Self>, idx: usize) -> *const Self {
                    $get(vec, idx)
                }

                unsafe fn vec_get_mut(vec: *mut NativeVec<Self>, idx: usize) -> *mut Self {
                    $get_mut(vec, idx)
                }

                unsafe fn vec_set(vec: *mut NativeVec<Self>, idx: usize, item: *mut Self) -> bool {
                    $set(vec, idx, item)
                }

                unsafe fn vec_push(vec: *mut NativeVec<Self>, item: *mut Self) {
                    $push(vec, item)
                }
            }
        )+
    };
}

vec_values! {
    u8 => "RVec_U8" {
        rsharp__RVec_U8__new, rsharp__RVec_U8__drop, rsharp__RVec_U8__len, rsharp__RVec_U8__get,
        rsharp__RVec_U8__get_mut, rsharp__RVec_U8__set, rsharp__RVec_U8__push
    }
    u16 => "RVec_U16" {
        rsharp__RVec_U16__new, rsharp__RVec_U16__drop, rsharp__RVec_U16__len, rsharp__RVec_U16__get,
        rsharp__RVec_U16__get_mut, rsharp__RVec_U16__set, rsharp__RVec_U16__push
    }
    u32 => "RVec_U32" {
        rsharp__RVec_U32__new, rsharp__RVec_U32__drop, rsharp__RVec_U32__len, rsharp__RVec_U32__get,
        rsharp__RVec_U32__get_mut, rsharp__RVec_U32__set, rsharp__RVec_U32__push
    }
    u64 => "RVec_U64" {
        rsharp__RVec_U64__new, rsharp__RVec_U64__drop, rsharp__RVec_U64__len, rsharp__RVec_U64__get,
        rsharp__RVec_U64__get_mut, rsharp__RVec_U64__set, rsharp__RVec_U64__push
    }
    i8 => "RVec_I8" {
        rsharp__RVec_I8__new, rsharp__RVec_I8__drop, rsharp__RVec_I8__len, rsharp__RVec_I8__get,
        rsharp__RVec_I8__get_mut, rsharp__RVec_I8__set, rsharp__RVec_I8__push
    }
    i16 => "RVec_I16" {
        rsharp__RVec_I16__new, rsharp__RVec_I16__drop, rsharp__RVec_I16__len, rsharp__RVec_I16__get,
        rsharp__RVec_I16__get_mut, rsharp__RVec_I16__set, rsharp__RVec_I16__push
    }
    i32 => "RVec_I32" {
        rsharp__RVec_I32__new, rsharp__RVec_I32__drop, rsharp__RVec_I32__len, rsharp__RVec_I32__get,
        rsharp__RVec_I32__get_mut, rsharp__RVec_I32__set, rsharp__RVec_I32__push
    }
    i64 => "RVec_I64" {
        rsharp__RVec_I64__new, rsharp__RVec_I64__drop, rsharp__RVec_I64__len, rsharp__RVec_I64__get,
        rsharp__RVec_I64__get_mut, rsharp__RVec_I64__set, rsharp__RVec_I64__push
    }
    bool => "RVec_Bool" {
        rsharp__RVec_Bool__new, rsharp__RVec_Bool__drop, rsharp__RVec_Bool__len, rsharp__RVec_Bool__get,
        rsharp__RVec_Bool__get_mut, rsharp__RVec_Bool__set, rsharp__RVec_Bool__push
    }
    f32 => "RVec_F32" {
        rsharp__RVec_F32__new, rsharp__RVec_F32__drop, rsharp__RVec_F32__len, rsharp__RVec_F32__get,
        rsharp__RVec_F32__get_mut, rsharp__RVec_F32__set, rsharp__RVec_F32__push
    }
    f64 => "RVec_F64" {
        rsharp__RVec_F64__new, rsharp__RVec_F64__drop, rsharp__RVec_F64__len, rsharp__RVec_F64__get,
        rsharp__RVec_F64__get_mut, rsharp__RVec_F64__set, rsharp__RVec_F64__push
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::{rsharp__Box_F64__new, rsharp__Box_I32__new};

    #[test]
    fn test_push_get_set() {
        unsafe {
            let vec = rsharp__RVec_I32__new();
            rsharp__RVec_I32__push(vec, rsharp__Box_I32__new(3));
            rsharp__RVec_I32__push(vec, rsharp__Box_I32__new(4));
            rsharp__RVec_I32__push(vec, core::ptr::null_mut());
            assert_eq!(rsharp__RVec_I32__len(vec), 2);

            assert!(rsharp__RVec_I32__set(vec, 1, rsharp__Box_I32__new(9)));
            assert!(!rsharp__RVec_I32__set(vec, 5, rsharp__Box_I32__new(1)));
            assert_eq!(*rsharp__RVec_I32__get(vec, 1), 9);
            assert!(rsharp__RVec_I32__get(vec, 2).is_null());
            assert_eq!((*vec).as_slice(), &[3, 9]);

            rsharp__RVec_I32__drop(vec);
        }
    }

    #[test]
    fn test_other_element_types_share_the_shape() {
        unsafe {
            let vec = <f64 as VecValue>::vec_new();
            f64::vec_push(vec, rsharp__Box_F64__new(0.5));
            *f64::vec_get_mut(vec, 0) += 1.0;
            assert_eq!(f64::vec_len(vec), 1);
            assert_eq!(*f64::vec_get(vec, 0), 1.5);
            assert!(f64::vec_get_mut(vec, 1).is_null());
            f64::vec_drop(vec);
        }

        assert_eq!(<NativeVec<bool> as NativeType>::NAME, "RVec_Bool");
        assert_eq!(<NativeVec<u64> as NativeType>::NAME, "RVec_U64");
    }
}
