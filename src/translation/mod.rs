/*!
 * Translation of prepared paragraphs.
 *
 * - `core`: the `Translation` orchestrator, retries and callbacks
 * - `handler`: worker pool feeding a single result processor
 * - `glossary`: term protection through placeholders
 * - `batch`: OpenAI batch flow for whole jobs
 */

pub use self::core::{Callbacks, StreamingEvent, Translation};
pub use self::glossary::Glossary;
pub use self::handler::Handler;

pub mod batch;
pub mod core;
pub mod glossary;
pub mod handler;
