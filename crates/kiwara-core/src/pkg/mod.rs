//! Package metadata and the resolved dependency tree.
//!
//! Provides utilities for:
//! - Parsing root package references (name@version)
//! - Fetching packuments from the npm registry
//! - Resolving npm version ranges using semver
//! - Serving manifests through cached metadata providers
//! - Querying the resolved tree and computing statistics over it
//! - Fetching download statistics

pub mod downloads;
pub mod error;
pub mod manifest;
pub mod node;
pub mod provider;
pub mod registry;
pub mod spec;
pub mod stats;
pub mod version;

pub use downloads::{DownloadStatistic, DownloadsClient, DEFAULT_DOWNLOADS_API, DOWNLOADS_API_ENV};
pub use error::{codes as pkg_codes, PkgError};
pub use manifest::{DependencyType, DeprecatedInfo, Manifest};
pub use node::{format_path, NodeId, PackageNode, PackageTree, PackageView};
pub use provider::{MemoryProvider, MetadataProvider, RegistryProvider};
pub use registry::{RegistryClient, DEFAULT_REGISTRY, REGISTRY_ENV};
pub use spec::PackageRef;
pub use stats::{DependencyStats, MostReferred};
pub use version::{resolve_version, NpmRange};
