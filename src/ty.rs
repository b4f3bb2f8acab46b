// Copyright (c) 2017-2020 Fabian Schuiki

//! Types of values.

use std::sync::Arc;

pub use self::TypeKind::*;

/// An IR type.
///
/// Types are reference counted and structurally compared. Two instructions
/// agree on their type iff the `TypeKind`s are equal.
pub type Type = Arc<TypeKind>;

/// The different kinds of types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The `void` type.
    VoidType,
    /// Integer types like `i32`.
    IntType(usize),
    /// Floating-point types `f32` and `f64`.
    FloatType(usize),
    /// The opaque pointer type `ptr`.
    PointerType,
    /// Array types like `[4 x i32]`.
    ArrayType(usize, Type),
    /// Vector types like `<4 x i32>`.
    VectorType(usize, Type),
    /// Struct types like `{i8, i32}`.
    StructType(Vec<Type>),
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            VoidType => write!(f, "void"),
            IntType(w) => write!(f, "i{}", w),
            FloatType(w) => write!(f, "f{}", w),
            PointerType => write!(f, "ptr"),
            ArrayType(l, ref ty) => write!(f, "[{} x {}]", l, ty),
            VectorType(l, ref ty) => write!(f, "<{} x {}>", l, ty),
            StructType(ref tys) => {
                write!(f, "{{")?;
                write_commas(f, tys)?;
                write!(f, "}}")?;
                Ok(())
            }
        }
    }
}

impl TypeKind {
    /// Check if this is the void type.
    pub fn is_void(&self) -> bool {
        *self == VoidType
    }

    /// Check if this is an integer type.
    pub fn is_int(&self) -> bool {
        match *self {
            IntType(_) => true,
            _ => false,
        }
    }

    /// Check if this is a floating-point type.
    pub fn is_float(&self) -> bool {
        match *self {
            FloatType(_) => true,
            _ => false,
        }
    }

    /// Check if this is the pointer type.
    pub fn is_pointer(&self) -> bool {
        *self == PointerType
    }

    /// Unwrap the width of an integer type, or panic.
    pub fn unwrap_int(&self) -> usize {
        match *self {
            IntType(w) => w,
            _ => panic!("unwrap_int called on {}", self),
        }
    }

    /// Unwrap the width of a floating-point type, or panic.
    pub fn unwrap_float(&self) -> usize {
        match *self {
            FloatType(w) => w,
            _ => panic!("unwrap_float called on {}", self),
        }
    }

    /// Unwrap the field types of a struct type, or panic.
    pub fn unwrap_struct(&self) -> &[Type] {
        match *self {
            StructType(ref tys) => tys,
            _ => panic!("unwrap_struct called on {}", self),
        }
    }

    /// Get the element type of an array, vector, or struct field access.
    pub fn field(&self, idx: usize) -> Option<Type> {
        match *self {
            ArrayType(l, ref ty) | VectorType(l, ref ty) if idx < l => Some(ty.clone()),
            StructType(ref tys) => tys.get(idx).cloned(),
            _ => None,
        }
    }
}

/// Create a void type.
pub fn void_ty() -> Type {
    Arc::new(VoidType)
}

/// Create an integer type of the requested width.
pub fn int_ty(width: usize) -> Type {
    Arc::new(IntType(width))
}

/// Create a floating-point type of the requested width (32 or 64).
pub fn float_ty(width: usize) -> Type {
    assert!(width == 32 || width == 64, "invalid float width {}", width);
    Arc::new(FloatType(width))
}

/// Create a pointer type.
pub fn pointer_ty() -> Type {
    Arc::new(PointerType)
}

/// Create an array type.
pub fn array_ty(length: usize, element: Type) -> Type {
    Arc::new(ArrayType(length, element))
}

/// Create a vector type.
pub fn vector_ty(length: usize, element: Type) -> Type {
    Arc::new(VectorType(length, element))
}

/// Create a struct type.
pub fn struct_ty(fields: Vec<Type>) -> Type {
    Arc::new(StructType(fields))
}

/// Formats a slice of elements that implement the `std::fmt::Display` trait as
/// a comma separated list.
fn write_commas<T: std::fmt::Display>(f: &mut std::fmt::Formatter, v: &[T]) -> std::fmt::Result {
    let mut it = v.iter();
    if let Some(x) = it.next() {
        write!(f, "{}", x)?;
    }
    for x in it {
        write!(f, ", {}", x)?;
    }
    Ok(())
}
