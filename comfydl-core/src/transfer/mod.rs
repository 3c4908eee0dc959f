//! Transfer, size probing and free-space collaborators.
//!
//! The install planners only see the traits in [`types`]. The concrete
//! implementations shell out to `aria2c`/`wget`, issue HTTP `HEAD` requests
//! and query mounted disks.

mod credentials;
mod external;
mod probe;
mod space;
mod types;

pub use credentials::Credentials;
pub use external::{DownloaderKind, ExternalDownloader};
pub use probe::{HttpSizeProbe, MAX_CONCURRENT_PROBES};
pub use space::SystemSpaceProbe;
pub use types::{ProbeError, SizeProbe, SpaceProbe, TransferError, TransferExecutor, TransferOutcome};
