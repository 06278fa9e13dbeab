//! Error types for the storage and membership engine.
//!
//! This module declares focused, composable error types used across the
//! allocator, component registry, and context orchestration paths. Each error
//! carries enough context to make failures actionable while remaining small
//! and cheap to pass around or convert into the aggregate [`EcsError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models a single failure mode (e.g.
//!   oversized allocation requests, frozen-registry registration, stale
//!   entity handles).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into [`EcsError`].
//! * **Actionability:** Structured fields (requested vs. available sizes,
//!   offending type names) make logs useful without reproducing the issue.
//!
//! ## Taxonomy
//! * **Configuration errors** — a zero block size at allocator construction,
//!   or a single entity record exceeding the configured block size. Fatal
//!   for the offending configuration; surfaced immediately.
//! * **Invalid-request errors** — zero-byte or oversized allocation requests.
//!   Recoverable by the caller adjusting the call.
//! * **Logic no-ops** — adding components an entity already has, removing
//!   components it doesn't, duplicate types in an argument list, registering
//!   the same system twice. These are *not* errors and are silently absorbed
//!   by the context.
//!
//! All error conditions are detected at the point of the offending call and
//! reported synchronously; there is no deferred or batched error reporting.

use std::fmt;

use crate::engine::types::EntityId;


/// Result alias used throughout the engine.
pub type EcsResult<T> = Result<T, EcsError>;

/// Returned when the block allocator cannot satisfy a request.
///
/// ### Variants
/// * `ZeroBlockSize` — the allocator was constructed with `block_size == 0`;
///   a configuration error.
/// * `ZeroSizedRequest` — a request for zero bytes; the allocator hands out
///   only non-empty ranges.
/// * `RequestTooLarge` — a single request larger than one block. Requests
///   never span blocks, so this can never be satisfied without
///   reconfiguring the block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationError {
    /// Allocator constructed with a zero block size.
    ZeroBlockSize,

    /// A zero-byte memory request.
    ZeroSizedRequest,

    /// A request exceeding the configured block size.
    RequestTooLarge {
        /// Number of bytes requested.
        requested: usize,
        /// Configured size of one block.
        block_size: usize,
    },
}

impl fmt::Display for AllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationError::ZeroBlockSize => f.write_str("allocator block size must be non-zero"),
            AllocationError::ZeroSizedRequest => f.write_str("cannot request zero bytes"),
            AllocationError::RequestTooLarge { requested, block_size } => write!(
                f,
                "request of {} bytes exceeds block size of {} bytes",
                requested, block_size
            ),
        }
    }
}

impl std::error::Error for AllocationError {}

/// Returned when component registration or lookup fails.
///
/// ### Variants
/// The registry is built once at startup and frozen when handed to a
/// context, so most of these indicate setup mistakes rather than runtime
/// conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Registration attempted after the registry was frozen.
    Frozen,

    /// All component-type ids are in use.
    CapacityExceeded {
        /// Maximum number of registrable component types.
        capacity: usize,
    },

    /// The component type has no data; byte-packed records cannot hold it.
    ZeroSized {
        /// Rust type name of the offending component.
        name: &'static str,
    },

    /// The component's alignment exceeds what slab placement guarantees.
    UnsupportedAlignment {
        /// Rust type name of the offending component.
        name: &'static str,
        /// Alignment of the component type in bytes.
        align: usize,
        /// Maximum alignment the allocator guarantees.
        max: usize,
    },

    /// A component type was used without having been registered.
    UnknownComponent {
        /// Rust type name of the unregistered component.
        name: &'static str,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Frozen => f.write_str("component registry is frozen"),
            RegistryError::CapacityExceeded { capacity } => {
                write!(f, "component capacity of {} types exceeded", capacity)
            }
            RegistryError::ZeroSized { name } => {
                write!(f, "zero-sized component type {} cannot be stored", name)
            }
            RegistryError::UnsupportedAlignment { name, align, max } => write!(
                f,
                "component {} has alignment {} above the supported maximum of {}",
                name, align, max
            ),
            RegistryError::UnknownComponent { name } => {
                write!(f, "component type {} is not registered", name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Returned when an [`Entity`](crate::engine::entity::Entity) handle refers
/// to an entity that was never created in this context or has been destroyed.
///
/// Entity ids are never reused, so a stale handle can only ever name a
/// destroyed entity — there is no ABA hazard to guard against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleEntityError {
    /// The offending entity id.
    pub entity: EntityId,
}

impl fmt::Display for StaleEntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {} is stale or was destroyed", self.entity)
    }
}

impl std::error::Error for StaleEntityError {}

/// Aggregate error for context-level operations.
///
/// Low-level modules return their own dedicated error types; the context
/// bubbles them up through `?` into this enum, which callers can match on
/// for control flow or log via `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    /// The block allocator rejected a request.
    Allocation(AllocationError),

    /// Component registration or lookup failed.
    Registry(RegistryError),

    /// An entity handle was stale.
    StaleEntity(StaleEntityError),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::Allocation(e) => write!(f, "{e}"),
            EcsError::Registry(e) => write!(f, "{e}"),
            EcsError::StaleEntity(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EcsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EcsError::Allocation(e) => Some(e),
            EcsError::Registry(e) => Some(e),
            EcsError::StaleEntity(e) => Some(e),
        }
    }
}

impl From<AllocationError> for EcsError {
    fn from(e: AllocationError) -> Self {
        EcsError::Allocation(e)
    }
}

impl From<RegistryError> for EcsError {
    fn from(e: RegistryError) -> Self {
        EcsError::Registry(e)
    }
}

impl From<StaleEntityError> for EcsError {
    fn from(e: StaleEntityError) -> Self {
        EcsError::StaleEntity(e)
    }
}
