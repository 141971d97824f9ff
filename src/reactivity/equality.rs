// ============================================================================
// spark-store - Equality Functions
// The default "same value" policy plus helpers for custom predicates
// ============================================================================

use std::rc::Rc;
use std::sync::Arc;

// =============================================================================
// SAME VALUE (Default)
// =============================================================================

/// Identity-style equality used when a selector is given no comparator.
///
/// Plain values compare by value. Floats are special-cased: `NaN` equals
/// `NaN`, and `+0.0` does NOT equal `-0.0`. Shared pointers (`Rc`, `Arc`)
/// compare by identity, never by contents, so selecting an `Rc` field only
/// re-delivers when the pointer itself was replaced.
///
/// # Example
/// ```
/// use spark_store::SameValue;
///
/// assert!(f64::NAN.same_value(&f64::NAN));
/// assert!(!0.0f64.same_value(&-0.0));
/// assert!(3.same_value(&3));
/// ```
pub trait SameValue {
    fn same_value(&self, other: &Self) -> bool;
}

/// Free-function form of [`SameValue::same_value`].
pub fn same_value<T: SameValue + ?Sized>(a: &T, b: &T) -> bool {
    a.same_value(b)
}

macro_rules! same_value_by_eq {
    ($($t:ty),* $(,)?) => {
        $(
            impl SameValue for $t {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_by_eq!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, str, String,
);

macro_rules! same_value_float {
    ($($t:ty),*) => {
        $(
            impl SameValue for $t {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    if self.is_nan() {
                        return other.is_nan();
                    }
                    // == already says +0 == -0; the sign check separates them
                    self == other && self.is_sign_negative() == other.is_sign_negative()
                }
            }
        )*
    };
}

same_value_float!(f32, f64);

impl<T: SameValue + ?Sized> SameValue for &T {
    fn same_value(&self, other: &Self) -> bool {
        (**self).same_value(*other)
    }
}

impl<T: ?Sized> SameValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> SameValue for Arc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_value(b),
            _ => false,
        }
    }
}

macro_rules! same_value_tuple {
    ($(($($name:ident : $idx:tt),+)),*) => {
        $(
            impl<$($name: SameValue),+> SameValue for ($($name,)+) {
                fn same_value(&self, other: &Self) -> bool {
                    $(self.$idx.same_value(&other.$idx))&&+
                }
            }
        )*
    };
}

same_value_tuple!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3)
);

// =============================================================================
// STRUCTURAL HELPERS
// =============================================================================

/// Plain `PartialEq` equality, for slices that do not implement [`SameValue`].
///
/// Note that under `PartialEq`, `NaN != NaN`, so a selected `NaN` is re-delivered
/// on every mutation. Prefer [`same_value`] for floats.
pub fn equals<T: PartialEq + ?Sized>(a: &T, b: &T) -> bool {
    a == b
}

/// Element-wise `PartialEq` over slices.
pub fn shallow_equals_slice<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Never equal: every mutation re-delivers.
pub fn never_equals<T: ?Sized>(_a: &T, _b: &T) -> bool {
    false
}

/// Always equal: the first delivered value sticks for the binding's lifetime.
pub fn always_equals<T: ?Sized>(_a: &T, _b: &T) -> bool {
    true
}

/// Compare two values by a projected key.
///
/// # Example
/// ```
/// use spark_store::by_field;
///
/// struct User { id: u32, name: String }
///
/// let eq = by_field(|u: &User| u.id);
/// let a = User { id: 1, name: "a".into() };
/// let b = User { id: 1, name: "b".into() };
/// assert!(eq(&a, &b));
/// ```
pub fn by_field<T, F, R>(field_fn: F) -> impl Fn(&T, &T) -> bool
where
    F: Fn(&T) -> R,
    R: PartialEq,
{
    move |a, b| field_fn(a) == field_fn(b)
}

// =============================================================================
// TESTS
// =============================================================================
