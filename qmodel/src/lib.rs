pub mod ast;
pub mod chunk;
pub mod compiled;
pub mod ddl;
pub mod key_pack;
pub mod qid;
pub mod scalar;

pub use ast::{Ast, CompOp, Projection, Select, WhereExpr};
pub use chunk::{Chunk, ChunkEntry, DecodedRow};
pub use compiled::{CompiledWhere, KeyPart, SubQuery};
pub use ddl::{FieldDef, KeyComponent, Quantum, QuantumUnit, TableDdl, TableDdlRef};
pub use key_pack::pack_startkey;
pub use qid::{NodeId, Qid, QidGenerator, SubQid};
pub use scalar::{Literal, ScalarType, Value};
