//! linepipe-kernel: streaming text pipelines built from named stages.
//!
//! This crate provides:
//!
//! - **Stages**: the [`Stage`] contract and the builtin line stages
//! - **Lexer**: quote-aware tokenizer and command-list splitter
//! - **Parser**: stage descriptors such as `grep -i error` into stages
//! - **Scheduler**: bounded pipe links and the concurrent [`Pipeline`]
//! - **Config**: link capacity, separator and timeout from `config.toml`
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use linepipe_kernel::{Pipeline, StageContext};
//!
//! let pipeline = Pipeline::from_descriptors(&["grep -i error", "sort", "uniq"])?;
//! let mut input: &[u8] = b"Error b\nok\nerror a\n";
//! let mut output = Vec::new();
//! pipeline.run(&StageContext::new(), &mut input, &mut output).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod lexer;
pub mod parser;
pub mod scheduler;
pub mod stages;

pub use config::PipelineConfig;
pub use lexer::{split_commands, tokenize};
pub use parser::{parse, parse_all, stage_help, stage_names, ParseError};
pub use scheduler::{Pipeline, PipelineError};
pub use stages::{Stage, StageContext, StageError};
