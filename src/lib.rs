//! # `live_progress`
//!
//! Thread-safe, cloneable terminal progress indicators that animate on background
//! threads.
//!
//! `live_progress` draws spinners and progress bars in place on a single terminal line
//! using carriage returns. It is designed to be:
//!
//! * **Concurrent**: Indicator handles are cheap to clone ([`Arc`](std::sync::Arc)-based)
//!   and every operation is safe to call from any thread, in any order.
//! * **Deterministic on shutdown**: [`Spinner::stop`] and [`Bar::stop`] return only after
//!   the indicator's background threads have exited and its line has been cleared.
//!   No frame is ever written after `stop` returns.
//! * **Terminal-aware**: Bars may follow the terminal width, re-measuring on start and
//!   (on unix) whenever the terminal is resized.
//!
//! ## Modules
//!
//! * [`spinner`]: Indeterminate indicators cycling through [`Frames`] on a timer.
//! * [`bar`]: Determinate indicators redrawn on every progress update.
//! * [`builder`]: Fluent interface for constructing configured indicators.
//! * [`registry`]: Named collections of indicators sharing one output.
//! * [`io`]: Wrappers for [`std::io::Read`] and [`std::io::Write`] that move a bar.
//! * [`iter`]: Extension traits for tracking progress on Iterators.
//! * [`frames`], [`sink`], [`width`], [`state`]: The building blocks above.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use live_progress::Spinner;
//!
//! let answer = Spinner::perform("Thinking", || {
//!     std::thread::sleep(Duration::from_secs(1));
//!     42
//! });
//! assert_eq!(answer, 42);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod animator;
pub mod bar;
pub mod builder;
pub mod error;
pub mod frames;
pub mod io;
pub mod iter;
pub mod registry;
pub mod sink;
pub mod spinner;
pub mod state;
pub mod width;

pub use bar::{Bar, BarConfig};
pub use builder::{BarBuilder, SpinnerBuilder};
pub use error::{Error, Result};
pub use frames::{Frames, Track};
pub use io::{ProgressReader, ProgressWriter};
pub use iter::{ProgressIter, ProgressIteratorExt};
pub use registry::{
    EntrySnapshot, Indicator, LabeledIndicator, MultiBar, MultiSpinner, Registry,
    RegistrySnapshot,
};
pub use sink::{SharedBuffer, Sink};
pub use spinner::{Spinner, SpinnerConfig};
pub use state::{IndicatorKind, Lifecycle, Snapshot};
pub use width::WidthProbe;
