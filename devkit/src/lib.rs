/*!
# Maintenance DevKit - Stubs and helpers for pipeline development

Helpers for exercising the maintenance kernel without external services:
- `SearchStub`: local HTTP server speaking the Azure AI Search query API
- `EventBuilder`: telemetry event payloads and CSV history fixtures
*/

pub mod event_builder;
pub mod search_stub;

pub use event_builder::{history_csv, EventBuilder};
pub use search_stub::{search_document, RecordedQuery, SearchStub};
