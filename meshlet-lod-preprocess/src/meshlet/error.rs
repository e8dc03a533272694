use std::fmt::{Debug, Display, Formatter};

#[derive(Debug)]
pub enum MeshletError {
	PrimitiveMustBeTriangleList,
	NoVertexPositions,
	EmptyPrimitive,
	IndexCountNotMultipleOfThree,
	IndexOutOfBounds,
}

impl Display for MeshletError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			MeshletError::PrimitiveMustBeTriangleList => f.write_str("All primitives must be triangle lists"),
			MeshletError::NoVertexPositions => f.write_str("A mesh primitive exists with no vertex positions"),
			MeshletError::EmptyPrimitive => f.write_str("A mesh primitive exists with no triangles"),
			MeshletError::IndexCountNotMultipleOfThree => {
				f.write_str("A mesh primitive has an index count that is not a multiple of 3")
			}
			MeshletError::IndexOutOfBounds => f.write_str("A mesh primitive references a vertex that does not exist"),
		}
	}
}

impl std::error::Error for MeshletError {}
