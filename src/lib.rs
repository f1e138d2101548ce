//! bpt: blueprint prompt template resolution.
//!
//! A template is a base text with `/input` and `{agent}` references. Input
//! fields are filled from caller values; agent fields are small instructions
//! that are themselves resolved and sent to an inference capability, in
//! dependency order, before their results are substituted into the base text.
//!
//! ```
//! use bpt::engine::Resolver;
//! use bpt::inference::EchoInference;
//! use bpt::template::{Field, InputValues, Template};
//!
//! let template = Template::new("result: {A}")
//!     .with_field(Field::input("word"))
//!     .with_field(Field::agent("A", "echo /word"));
//! let mut inputs = InputValues::new();
//! inputs.insert("word".to_string(), "world".to_string());
//!
//! let resolution = Resolver::new(&EchoInference).resolve(&template, &inputs, None)?;
//! assert_eq!(resolution.text, "result: echo world");
//! # Ok::<(), bpt::error::BptError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod graph;
pub mod inference;
pub mod reference;
pub mod template;

#[cfg(test)]
mod test_support;
