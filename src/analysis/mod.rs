/// Statistical stages of the anomaly pipeline.
///
/// Each stage is a pure function of its input series; nothing here
/// performs I/O or holds state between calls.
///
/// Submodules:
/// - `groupings` — organizes flat fetch output into per-series structures.
/// - `transform` — frequency normalization (rolling aggregate + downsample).
/// - `bounds` — `mean ± k·σ` envelope over a transformed series.
/// - `significance` — record / threshold classification of the latest value.

pub mod bounds;
pub mod groupings;
pub mod significance;
pub mod transform;
