//! # tokenloom
//!
//! A grammar-agnostic tokenization engine. The caller registers named
//! patterns and a transition function (the "control resolver"); the
//! engine scans an input string left to right, at each position trying
//! the patterns of an ordered, context-dependent expectation set at the
//! *exact* current offset, first match wins. Tokens come out one at a
//! time through a suspend/resume cursor, and qualifying matches are
//! simultaneously attached to a tree that groups fragments by lexical
//! context ("inside a quoted string", "inside a tag", ...).
//!
//! The engine knows nothing about any concrete grammar. A lexer for a
//! specific language is built on top of it by supplying patterns and a
//! resolver; the resolver maps each produced token to the next control:
//! the next expectation set plus structural effects (context pushes and
//! pops, or a wrap that nests the match one tree level deeper without
//! touching the stack).
//!
//! ```
//! use tokenloom::{Control, Engine};
//!
//! let mut engine = Engine::new();
//! engine
//!     .define_patterns(&[("WORD", "([a-zA-Z]+)"), ("SPACE", r"(\s+)")])
//!     .unwrap();
//! engine.set_ctl_resolver(|token| {
//!     Some(match token.pattern_id() {
//!         "WORD" => Control::expect(["SPACE"]),
//!         _ => Control::expect(["WORD"]),
//!     })
//! });
//! engine.set_root_ctl(Control::expect(["WORD"]));
//!
//! let tree = engine.process("ab cd", None, 0).unwrap();
//! assert_eq!(tree.get(tree.root()).unwrap().children().len(), 3);
//! ```

pub mod context;
pub mod control;
pub mod engine;
pub mod error;
pub mod matching;
pub mod position;

pub use context::{ContextName, ContextNode, ContextTree, NodeId, TreeItem};
pub use control::{Control, Effects, Expectations};
pub use engine::{Engine, PatternKey, Token, TokenCursor};
pub use error::Error;
pub use matching::{MatchRecord, Pattern};
pub use position::{Position, PositionTracker};
