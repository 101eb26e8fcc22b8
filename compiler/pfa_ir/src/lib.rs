//! PFA IR - positions, names and the raw expression tree.
//!
//! This crate contains the data structures shared by every later stage:
//! - `Pos` for document-path source locations
//! - `Name` for cheap-to-clone identifiers
//! - `ExprArena` / `ExprId` for the flat raw AST
//! - `Document` for the top-level skeleton of a scoring document
//!
//! # Design Philosophy
//!
//! - **Flatten Everything**: no `Box<Expr>`, children are `ExprId(u32)` indices
//! - **Untyped**: nothing here knows about types; the raw tree is what the
//!   document says, and type expressions stay generic JSON (`TypeExpr`) until
//!   the checker resolves them

pub mod ast;
mod document;
mod expr_id;
mod name;
mod pos;

pub use ast::{CastCase, Expr, ExprArena, ExprKind, FcnDef, Literal, NewItems, Param};
pub use document::{CellDecl, Document, FcnDecl, Method, OptionEntry, PoolDecl, TypeExpr};
pub use expr_id::ExprId;
pub use name::Name;
pub use pos::Pos;
