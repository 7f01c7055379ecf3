//! Client-side helper toolkit: request transport, delegated event binding
//! and a few small utilities.
//!
//! # Overview
//! - [`Transport`] dispatches an HTTP request through the first available
//!   [`Provider`] and routes the final status to a success or error callback
//!   (status below 400 is success). A [`Pending`] signal resolves once with
//!   the same [`Outcome`].
//! - [`Binder`] attaches one capturing listener per event type and scope to a
//!   [`Document`] and fans events out to handlers bound by `#id` or `.class`.
//! - [`encode_params`], [`format`] and [`Logger`] are the small pieces the
//!   two above rely on.
//!
//! # Design
//! - Nothing here is global. A `Transport` or `Binder` is a value owned by
//!   the application context that creates it.
//! - Request shaping (`build_get`, `build_post`) is plain data in, plain data
//!   out, so it can be checked without I/O.
//! - `Document` and `Binder` are single-threaded (`Rc`/`RefCell`), like the
//!   UI state they model. `Transport` is `Send + Sync`.

pub mod binder;
pub mod console;
pub mod dom;
pub mod error;
pub mod format;
pub mod http;
pub mod params;
pub mod provider;
pub mod transport;

pub use binder::{Binder, Binding, Handler, Selector};
pub use console::{Console, Logger, MemoryConsole, TracingConsole};
pub use dom::{Document, Element, ElementId, Event, Phase, Scope};
pub use error::TransportError;
pub use format::format;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use params::encode_params;
pub use provider::UreqProvider;
pub use transport::{
    build_get, build_post, Connection, ConnectOptions, Mode, Outcome, Pending, Provider, RequestDescriptor,
    Transport, TransportBuilder,
};
