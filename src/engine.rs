//! Pattern and resolution engine.
//!
//! This module is the entry point of the front end: it compiles syntax
//! patterns, keeps the registry of descriptors, and resolves script text into
//! typed elements. The parts live in focused submodules under `src/engine/`
//! and are re-exported here.
//!
//! ## How the parts work together
//!
//! ```text
//! pattern strings ── compile (pattern.rs) ──▶ PatternNode trees
//!                                                  │ stored per descriptor
//!                                                  v
//!                                   SyntaxRegistry (registry.rs)
//!                                                  │ shared, read-only
//!                                                  v
//! script text ───────────────▶ SyntaxParser (resolver.rs)
//!                               - literals, variables, list literals
//!                               - registered descriptors, recent first (recent.rs)
//!                               - MatchContext::match_full (matcher.rs)
//!                                   └─ slots resolve back through the parser
//!                               - diagnostics per line (diagnostics.rs)
//!                                                  │
//!                                                  v
//!                            Box<dyn Expression> / Element / Trigger
//! ```
//!
//! Resolution is recursive: an expression slot in a pattern is filled by
//! resolving the slot's text with the slot's expected type, one nesting level
//! down, so `print length of "abc" otherwise 0` resolves bottom-up through
//! three descriptors.
//!
//! ## Responsibilities by module
//!
//! - `pattern.rs`: the pattern grammar (`[optional]`, `(a|b)`, `N:` marks,
//!   `<regex>`, `%type%` slots) and its compiled form.
//! - `matcher.rs`: matching of compiled patterns; slots retry shorter ends, groups commit.
//! - `split.rs`: top-level list splitting and parenthesis stripping.
//! - `recent.rs`: per-category recency lists.
//! - `registry.rs`: descriptors and their factories.
//! - `resolver.rs`: the [`SyntaxParser`] handle.
//! - `diagnostics.rs`: pending errors and their per-line reporting.
//!
//! ## Debugging
//!
//! Resolution outcomes are logged with `tracing` at `debug` level and every
//! candidate attempt at `trace` level. Set `ParserOptions::debug` to get the
//! verbose `describe` form in those messages.

#[path = "engine/diagnostics.rs"]
mod diagnostics;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/pattern.rs"]
mod pattern;
#[path = "engine/recent.rs"]
mod recent;
#[path = "engine/registry.rs"]
mod registry;
#[path = "engine/resolver.rs"]
mod resolver;
#[path = "engine/split.rs"]
mod split;

#[allow(unused_imports)]
pub use diagnostics::{Diagnostic, Diagnostics, ErrorKind};
#[allow(unused_imports)]
pub use matcher::{MatchContext, PatternMatch};
#[allow(unused_imports)]
pub use pattern::{Acceptance, ChoiceAlternative, ExpressionSlot, PatternNode, RegexPattern, compile};
#[allow(unused_imports)]
pub use recent::{Category, RecentList, RecentLists};
#[allow(unused_imports)]
pub use registry::{ExpressionInfo, Factory, SyntaxInfo, SyntaxRegistry};
#[allow(unused_imports)]
pub use resolver::{ConditionalPolicy, SyntaxParser};
