//! A named collection of indicators sharing one terminal.
//!
//! The [`Registry`] is the "multi-bar" front end: indicators are added under a unique
//! name, get a fixed display line in insertion order, and are started, stopped, and
//! updated by name. [`MultiBar`] and [`MultiSpinner`] are the two concrete flavours.
//!
//! # Synchronization Strategy
//!
//! The entry list sits behind a coarse-grained [`RwLock`](parking_lot::RwLock). It is
//! only held long enough to look a name up and clone the indicator handle; starting,
//! stopping (which joins threads), and drawing all happen after the lock is released.
//!
//! All indicators created through [`Registry::add`](Registry) write to the registry's
//! [`Sink`], so their lines never interleave mid-write.

use std::{collections::HashMap, fmt, sync::Arc};

use compact_str::{CompactString, format_compact};
use parking_lot::RwLock;

use crate::{
    bar::{Bar, BarConfig},
    builder::{BarBuilder, SpinnerBuilder},
    error::{Error, Result},
    sink::Sink,
    spinner::{Spinner, SpinnerConfig},
    state::{Lifecycle, Snapshot},
    width::WidthProbe,
};

/// Lifecycle operations a [`Registry`] forwards to its entries.
pub trait Indicator: Clone + Send + Sync + 'static {
    /// Starts the indicator; a no-op while running.
    fn start(&self);

    /// Stops the indicator and waits for its workers; a no-op unless running.
    fn stop(&self);

    /// Returns to a fresh, never-started state.
    fn reset(&self);

    /// Current lifecycle state.
    fn lifecycle(&self) -> Lifecycle;

    /// A consistent copy of the indicator's state.
    fn snapshot(&self) -> Snapshot;

    /// Line written to the registry's sink before starting, if any.
    fn heading(&self, _label: &str) -> Option<CompactString> {
        None
    }

    /// Line written to the registry's sink after stopping, if any.
    fn footer(&self, _label: &str) -> Option<CompactString> {
        None
    }
}

impl Indicator for Bar {
    fn start(&self) {
        Self::start(self);
    }

    fn stop(&self) {
        Self::stop(self);
    }

    fn reset(&self) {
        Self::reset(self);
    }

    fn lifecycle(&self) -> Lifecycle {
        Self::lifecycle(self)
    }

    fn snapshot(&self) -> Snapshot {
        Self::snapshot(self)
    }

    fn heading(&self, label: &str) -> Option<CompactString> {
        Some(format_compact!("{label}:"))
    }

    fn footer(&self, label: &str) -> Option<CompactString> {
        Some(format_compact!("{label}: Complete!"))
    }
}

impl Indicator for Spinner {
    fn start(&self) {
        Self::start(self);
    }

    fn stop(&self) {
        Self::stop(self);
    }

    fn reset(&self) {
        Self::reset(self);
    }

    fn lifecycle(&self) -> Lifecycle {
        Self::lifecycle(self)
    }

    fn snapshot(&self) -> Snapshot {
        Self::snapshot(self)
    }
}

/// One registry entry: an indicator plus its name, label, and display line.
#[derive(Clone, Debug)]
pub struct LabeledIndicator<I> {
    name: CompactString,
    label: CompactString,
    line: usize,
    indicator: I,
}

impl<I> LabeledIndicator<I> {
    /// The unique key within the registry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The display text.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Display line, assigned in insertion order and never reassigned.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// The wrapped indicator.
    #[must_use]
    pub const fn indicator(&self) -> &I {
        &self.indicator
    }
}

struct Entries<I> {
    index: HashMap<CompactString, usize>,
    items: Vec<LabeledIndicator<I>>,
}

impl<I> Default for Entries<I> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            items: Vec::new(),
        }
    }
}

impl<I: Clone> Entries<I> {
    fn get(&self, name: &str) -> Result<&LabeledIndicator<I>> {
        self.index
            .get(name)
            .map(|&i| &self.items[i])
            .ok_or_else(|| Error::NotFound(name.into()))
    }
}

/// A thread-safe, cloneable collection of named indicators.
///
/// Duplicate names are rejected; entries are never removed, so display lines stay
/// stable for the registry's lifetime.
pub struct Registry<I> {
    entries: Arc<RwLock<Entries<I>>>,
    sink: Sink,
}

/// A registry of progress bars.
pub type MultiBar = Registry<Bar>;

/// A registry of spinners.
pub type MultiSpinner = Registry<Spinner>;

impl<I> Clone for Registry<I> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            sink: self.sink.clone(),
        }
    }
}

impl<I> fmt::Debug for Registry<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only metadata, to avoid locking every indicator.
        f.debug_struct("Registry")
            .field("count", &self.entries.read().items.len())
            .finish_non_exhaustive()
    }
}

impl<I: Indicator> Default for Registry<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Indicator> Registry<I> {
    /// An empty registry drawing to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(Sink::stdout())
    }

    /// An empty registry whose indicators all draw to `sink`.
    #[must_use]
    pub fn with_sink(sink: Sink) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries::default())),
            sink,
        }
    }

    /// The shared output every added indicator writes to.
    #[must_use]
    pub const fn sink(&self) -> &Sink {
        &self.sink
    }

    /// Registers an existing indicator and returns its display line.
    ///
    /// The indicator keeps whatever sink it was built with.
    ///
    /// # Errors
    ///
    /// [`Error::Duplicate`] if `name` is taken.
    pub fn push(
        &self,
        name: impl Into<CompactString>,
        label: impl Into<CompactString>,
        indicator: I,
    ) -> Result<usize> {
        let name = name.into();
        let mut entries = self.entries.write();
        if entries.index.contains_key(&name) {
            return Err(Error::Duplicate(name));
        }

        let line = entries.items.len();
        entries.index.insert(name.clone(), line);
        entries.items.push(LabeledIndicator {
            name,
            label: label.into(),
            line,
            indicator,
        });
        Ok(line)
    }

    /// Returns a handle to the indicator registered as `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<I> {
        self.entries
            .read()
            .get(name)
            .ok()
            .map(|entry| entry.indicator.clone())
    }

    /// Display line of `name`.
    #[must_use]
    pub fn line(&self, name: &str) -> Option<usize> {
        self.entries.read().index.get(name).copied()
    }

    /// Label of `name`.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<CompactString> {
        self.entries.read().get(name).ok().map(|e| e.label.clone())
    }

    /// Names in display order.
    #[must_use]
    pub fn names(&self) -> Vec<CompactString> {
        self.entries
            .read()
            .items
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    /// Clones of every entry, in display order.
    #[must_use]
    pub fn entries(&self) -> Vec<LabeledIndicator<I>> {
        self.entries.read().items.clone()
    }

    /// Number of registered indicators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().items.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().items.is_empty()
    }

    /// Lifecycle of `name`.
    #[must_use]
    pub fn lifecycle(&self, name: &str) -> Option<Lifecycle> {
        self.get(name).map(|i| i.lifecycle())
    }

    /// Starts `name`, announcing it on the shared sink first when it has a heading.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no indicator is registered as `name`.
    pub fn start(&self, name: &str) -> Result<()> {
        let entry = self.entries.read().get(name)?.clone();
        self.start_entry(&entry);
        Ok(())
    }

    /// Stops `name` and waits for its workers.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no indicator is registered as `name`.
    pub fn stop(&self, name: &str) -> Result<()> {
        let entry = self.entries.read().get(name)?.clone();
        self.stop_entry(&entry);
        Ok(())
    }

    /// Starts every indicator in display order.
    pub fn start_all(&self) {
        for entry in self.entries() {
            self.start_entry(&entry);
        }
    }

    /// Stops every indicator; each returns only after its own workers exited.
    pub fn stop_all(&self) {
        for entry in self.entries() {
            self.stop_entry(&entry);
        }
    }

    /// Returns every entry to a fresh, never-started state.
    pub fn reset_all(&self) {
        for entry in self.entries() {
            entry.indicator.reset();
        }
    }

    /// Returns `true` if no indicator is running.
    #[must_use]
    pub fn is_all_stopped(&self) -> bool {
        self.entries
            .read()
            .items
            .iter()
            .all(|e| e.indicator.lifecycle() != Lifecycle::Running)
    }

    /// State of every indicator at (roughly) the same instant.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        // Quick lock to clone the handles; each indicator is then locked on its own.
        let entries = self.entries();
        RegistrySnapshot(
            entries
                .into_iter()
                .map(|e| EntrySnapshot {
                    state: e.indicator.snapshot(),
                    name: e.name,
                    label: e.label,
                    line: e.line,
                })
                .collect(),
        )
    }

    fn start_entry(&self, entry: &LabeledIndicator<I>) {
        if entry.indicator.lifecycle() == Lifecycle::Running {
            return;
        }
        if let Some(heading) = entry.indicator.heading(&entry.label) {
            self.sink.emit_lossy(&format!("{heading}\n"));
        }
        entry.indicator.start();
    }

    fn stop_entry(&self, entry: &LabeledIndicator<I>) {
        if entry.indicator.lifecycle() != Lifecycle::Running {
            return;
        }
        entry.indicator.stop();
        if let Some(footer) = entry.indicator.footer(&entry.label) {
            self.sink.emit_lossy(&format!("{footer}\n"));
        }
    }
}

impl Registry<Bar> {
    /// Creates a bar from `config` drawing to the shared sink and registers it.
    ///
    /// # Errors
    ///
    /// [`Error::Duplicate`] if `name` is taken, [`Error::InvalidConfig`] if `config`
    /// is unusable.
    pub fn add(
        &self,
        name: impl Into<CompactString>,
        label: impl Into<CompactString>,
        config: BarConfig,
    ) -> Result<Bar> {
        self.add_with_probe(name, label, config, WidthProbe::terminal())
    }

    /// Like [`add`](Self::add) with an explicit width source.
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add).
    pub fn add_with_probe(
        &self,
        name: impl Into<CompactString>,
        label: impl Into<CompactString>,
        config: BarConfig,
        probe: WidthProbe,
    ) -> Result<Bar> {
        let bar = BarBuilder::from_config(config)
            .sink(self.sink.clone())
            .probe(probe)
            .build()?;
        self.push(name, label, bar.clone())?;
        Ok(bar)
    }

    /// Sets the progress of `name`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no bar is registered as `name`.
    pub fn set_progress(&self, name: &str, progress: f64) -> Result<()> {
        let bar = self.get(name).ok_or_else(|| Error::NotFound(name.into()))?;
        bar.set_progress(progress);
        Ok(())
    }

    /// Adds `delta` to the progress of `name`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no bar is registered as `name`.
    pub fn increment(&self, name: &str, delta: f64) -> Result<()> {
        let bar = self.get(name).ok_or_else(|| Error::NotFound(name.into()))?;
        bar.increment(delta);
        Ok(())
    }
}

impl Registry<Spinner> {
    /// Creates a spinner from `config` drawing to the shared sink and registers it.
    ///
    /// The label becomes the spinner's prefix.
    ///
    /// # Errors
    ///
    /// [`Error::Duplicate`] if `name` is taken, [`Error::InvalidConfig`] if `config`
    /// is unusable.
    pub fn add(
        &self,
        name: impl Into<CompactString>,
        label: impl Into<CompactString>,
        config: SpinnerConfig,
    ) -> Result<Spinner> {
        let label = label.into();
        let spinner = SpinnerBuilder::from_config(config)
            .prefix(format_compact!("{label} "))
            .sink(self.sink.clone())
            .build()?;
        self.push(name, label, spinner.clone())?;
        Ok(spinner)
    }

    /// Changes the label (and therefore the prefix) of `name`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no spinner is registered as `name`.
    pub fn update_label(&self, name: &str, label: impl Into<CompactString>) -> Result<()> {
        let label = label.into();
        let mut entries = self.entries.write();
        let &i = entries
            .index
            .get(name)
            .ok_or_else(|| Error::NotFound(name.into()))?;
        let entry = &mut entries.items[i];
        entry.indicator.set_prefix(format_compact!("{label} "));
        entry.label = label;
        Ok(())
    }
}

/// State of one registry entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntrySnapshot {
    /// Registry key.
    pub name: CompactString,
    /// Display text.
    pub label: CompactString,
    /// Display line.
    pub line: usize,
    /// Indicator state.
    pub state: Snapshot,
}

/// State of a whole registry, in display order.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegistrySnapshot(pub Vec<EntrySnapshot>);

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::{MultiBar, MultiSpinner};
    use crate::{
        Error,
        bar::BarConfig,
        sink::{SharedBuffer, Sink},
        spinner::SpinnerConfig,
        state::Lifecycle,
        width::WidthProbe,
    };

    fn bars() -> (MultiBar, SharedBuffer) {
        let buffer = SharedBuffer::new();
        (MultiBar::with_sink(Sink::from(buffer.clone())), buffer)
    }

    /// Stop All
    /// Two named bars both end up stopped after `stop_all`.
    #[test]
    fn test_stop_all() {
        let (registry, buffer) = bars();
        let config = BarConfig {
            width: 10,
            ..BarConfig::default()
        };
        registry.add("download", "Downloading", config.clone()).unwrap();
        registry.add("verify", "Verifying", config).unwrap();

        registry.start_all();
        registry.set_progress("download", 0.5).unwrap();
        registry.set_progress("verify", 0.2).unwrap();
        assert_eq!(registry.lifecycle("download"), Some(Lifecycle::Running));

        registry.stop_all();
        assert_eq!(registry.lifecycle("download"), Some(Lifecycle::Stopped));
        assert_eq!(registry.lifecycle("verify"), Some(Lifecycle::Stopped));
        assert!(registry.is_all_stopped());

        let out = buffer.contents();
        assert!(out.starts_with("Downloading:\n"));
        assert!(out.contains("Verifying: Complete!\n"));
    }

    /// Lines And Names
    /// Lines follow insertion order; duplicates and unknown names are errors.
    #[test]
    fn test_lines_and_lookup() {
        let (registry, _buffer) = bars();
        let probe = WidthProbe::fixed(40);
        registry
            .add_with_probe("a", "A", BarConfig::default(), probe.clone())
            .unwrap();
        registry
            .add_with_probe("b", "B", BarConfig::minimal(), probe)
            .unwrap();

        assert_eq!(registry.line("a"), Some(0));
        assert_eq!(registry.line("b"), Some(1));
        assert_eq!(registry.names(), ["a", "b"]);
        assert_eq!(registry.get("b").unwrap().width(), 38);

        let dup = registry.add("a", "again", BarConfig::default());
        assert!(matches!(dup, Err(Error::Duplicate(name)) if name == "a"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.line("a"), Some(0), "line never reassigned");

        assert!(matches!(registry.start("nope"), Err(Error::NotFound(_))));
        assert!(matches!(
            registry.set_progress("nope", 0.1),
            Err(Error::NotFound(_))
        ));
    }

    /// Shared Sink
    /// Bars added through the registry draw to its sink.
    #[test]
    fn test_shared_sink() {
        let (registry, _buffer) = bars();
        let bar = registry
            .add("x", "X", BarConfig { width: 5, ..BarConfig::default() })
            .unwrap();
        assert!(bar.sink().same_as(registry.sink()));
    }

    /// Concurrent Updates
    /// Several threads drive different bars by name without corrupting each other.
    #[test]
    fn test_updates_from_threads() {
        let (registry, _buffer) = bars();
        let names = ["one", "two", "three"];
        for name in names {
            registry
                .add(name, name, BarConfig { width: 8, ..BarConfig::default() })
                .unwrap();
        }
        registry.start_all();

        thread::scope(|s| {
            for name in names {
                let registry = registry.clone();
                s.spawn(move || {
                    for _ in 0..10 {
                        registry.increment(name, 0.1).unwrap();
                    }
                });
            }
        });

        let snapshot = registry.snapshot();
        for entry in &snapshot.0 {
            assert!((entry.state.progress() - 1.0).abs() < 1e-9, "{}", entry.name);
        }
        registry.stop_all();
    }

    /// Spinners
    /// Labels become prefixes and can be renamed while spinning.
    #[test]
    fn test_spinner_registry() {
        let buffer = SharedBuffer::new();
        let registry = MultiSpinner::with_sink(Sink::from(buffer.clone()));
        let config = SpinnerConfig {
            interval: Duration::from_millis(2),
            ..SpinnerConfig::default()
        };
        let fetch = registry.add("fetch", "Fetching", config.clone()).unwrap();
        registry.add("build", "Building", config).unwrap();
        assert_eq!(fetch.prefix(), "Fetching ");

        registry.start("fetch").unwrap();
        registry.update_label("fetch", "Fetched").unwrap();
        assert_eq!(registry.label("fetch").as_deref(), Some("Fetched"));
        assert_eq!(fetch.prefix(), "Fetched ");
        assert_eq!(registry.lifecycle("build"), Some(Lifecycle::Idle));

        registry.stop_all();
        assert_eq!(fetch.lifecycle(), Lifecycle::Stopped);
        assert_eq!(registry.lifecycle("build"), Some(Lifecycle::Idle));

        registry.reset_all();
        assert_eq!(fetch.lifecycle(), Lifecycle::Idle);
        assert!(matches!(
            registry.update_label("missing", "x"),
            Err(Error::NotFound(_))
        ));
    }
}
