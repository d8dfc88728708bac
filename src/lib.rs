//! storyscrape: follow a web serial's next-chapter links, assemble the chapters into one HTML
//! document, then optionally convert and deliver it.

pub mod cli;
pub mod config;
pub mod convert;
pub mod deliver;
pub mod document;
pub mod formats;
pub mod harvest;
pub mod logging;
pub mod model;

// Re-exports for CLI and consumers.
pub use convert::{ConvertError, EbookConverter, EpubConverter, ExternalConverter};
pub use deliver::{CommandSink, DeliveryError, DeliverySink};
pub use document::{DocumentAssembler, DocumentError, HtmlAttributeOverride, OverrideTarget};
pub use formats::{write_html, write_json, write_markdown, FormatError, OutputFormat};
pub use harvest::{
    harvest, CancelToken, FetchResult, HarvestConfig, HarvestError, HarvestOptions, HarvestReport,
    HarvestState, PageFetcher, PageFetcherBuilder, PageSource, StopReason,
};
pub use model::{Chapter, Story};
