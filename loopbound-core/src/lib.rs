//! Static loop trip-count estimation.
//!
//! `loopbound-core` reads an LLVM-style IR module and produces, for every natural loop,
//! either a trip-count interval or a classification that selects a configured fallback.
//!
//! ```rust
//! use loopbound_core::config::{AnalysisConfig, FallbackTable};
//! use loopbound_core::ir::{FunctionBuilder, Module, Predicate, Value};
//! use loopbound_core::loopbound::{Classification, LoopBoundAnalyzer, LoopKey};
//!
//! let mut b = FunctionBuilder::new("main", 0);
//! let entry = b.add_block("entry");
//! let header = b.add_block("for.cond");
//! let body = b.add_block("for.body");
//! let exit = b.add_block("for.end");
//! b.position_at_end(entry);
//! let i = b.alloca(32);
//! b.store(Value::Const(0), i);
//! b.br(header);
//! b.position_at_end(header);
//! let cur = b.load(i);
//! let cmp = b.icmp(Predicate::Slt, cur, Value::Const(9000));
//! b.cond_br(cmp, body, exit);
//! b.position_at_end(body);
//! let cur = b.load(i);
//! let next = b.add(cur, Value::Const(1));
//! b.store(next, i);
//! b.br(header);
//! b.position_at_end(exit);
//! b.ret(None);
//!
//! let mut module = Module::new("demo");
//! module.functions.push(b.finish().unwrap());
//!
//! let config = AnalysisConfig::new(FallbackTable::new(1, 1, 1, 1, 1).unwrap());
//! let report = LoopBoundAnalyzer::new(config).analyze_module(&module).unwrap();
//! let result = report.get(&LoopKey::new("main", 0)).unwrap();
//! assert_eq!(result.classification(), Classification::Normal);
//! assert_eq!(result.bound_interval().map(|b| (b.low(), b.high())), Some((9000, 9000)));
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod ir;
pub mod loopbound;

pub use config::{AnalysisConfig, FallbackTable};
pub use error::{AnalysisIssue, LoopBoundError, Result};
pub use loopbound::{LoopBoundAnalyzer, LoopBoundReport, LoopBoundResult};
