//! Chunked payload codec for fixed-width storage rows.
//!
//! Table backends cap the size of a single column, so an event payload is
//! spread across a fixed set of binary cells. Cells are filled in order with
//! [`CELL_SIZE`] bytes each; only the last occupied cell may be shorter.
//! Cells after the last occupied one stay absent, and absence round-trips as
//! "no chunk" rather than as an empty chunk.
//!
//! ```text
//! payload:  |<---- 64 KiB ---->|<---- 64 KiB ---->|<- rest ->|
//! cells:      data_00            data_01            data_02    data_03 .. data_14 (absent)
//! ```

/// Number of cells in a row.
pub const CELL_COUNT: usize = 15;

/// Size in bytes of one full cell.
pub const CELL_SIZE: usize = 64 * 1024;

/// Exclusive upper bound on payload length.
///
/// The raw cell capacity scaled by the 3/4 text-encoding overhead of
/// table backends that store binary columns as base64.
pub const MAX_CAPACITY: usize = CELL_COUNT * CELL_SIZE * 3 / 4;

/// Column names of the cells, in slot order.
pub const CELL_NAMES: [&str; CELL_COUNT] = [
    "data_00", "data_01", "data_02", "data_03", "data_04", "data_05", "data_06", "data_07",
    "data_08", "data_09", "data_10", "data_11", "data_12", "data_13", "data_14",
];

/// Errors raised by the payload codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The payload does not fit into the cells of one row.
    #[error("payload of {len} bytes exceeds the {max} byte row capacity")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Exclusive maximum length.
        max: usize,
    },

    /// A cell set violates the cell contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// The ordered cells of one storage row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellSet {
    cells: [Option<Vec<u8>>; CELL_COUNT],
}

impl CellSet {
    /// Create a set with every cell absent.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Place a chunk into the cell at `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidArgument`] if `slot` is out of range or
    /// the chunk is larger than [`CELL_SIZE`].
    pub fn set(&mut self, slot: usize, chunk: Vec<u8>) -> Result<(), CodecError> {
        if chunk.len() > CELL_SIZE {
            return Err(CodecError::InvalidArgument(format!(
                "cell {slot} holds {} bytes, limit is {CELL_SIZE}",
                chunk.len()
            )));
        }
        let cell = self.cells.get_mut(slot).ok_or_else(|| {
            CodecError::InvalidArgument(format!("cell slot {slot} out of range 0..{CELL_COUNT}"))
        })?;
        *cell = Some(chunk);
        Ok(())
    }

    /// Build a set from `(slot, chunk)` pairs read back from a backend.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidArgument`] on a bad slot or oversize chunk.
    pub fn from_cells<I>(cells: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = (usize, Vec<u8>)>,
    {
        let mut set = Self::empty();
        for (slot, chunk) in cells {
            set.set(slot, chunk)?;
        }
        Ok(set)
    }

    /// Build a set from a positional column list, where `None` is an absent
    /// cell.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidArgument`] if there are more columns than
    /// cells or a chunk is oversize.
    pub fn from_columns(columns: Vec<Option<Vec<u8>>>) -> Result<Self, CodecError> {
        if columns.len() > CELL_COUNT {
            return Err(CodecError::InvalidArgument(format!(
                "{} columns, a row has {CELL_COUNT} cells",
                columns.len()
            )));
        }
        Self::from_cells(
            columns
                .into_iter()
                .enumerate()
                .filter_map(|(slot, chunk)| chunk.map(|c| (slot, c))),
        )
    }

    /// Borrow the chunk at `slot`, if present.
    pub fn get(&self, slot: usize) -> Option<&[u8]> {
        self.cells.get(slot).and_then(Option::as_deref)
    }

    /// Iterate over every slot in order, present or not.
    pub fn iter(&self) -> impl Iterator<Item = Option<&[u8]>> {
        self.cells.iter().map(Option::as_deref)
    }

    /// Return the cells as a positional column list.
    pub fn into_columns(self) -> Vec<Option<Vec<u8>>> {
        self.cells.into_iter().collect()
    }

    /// Total number of payload bytes across present cells.
    pub fn payload_len(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .fold(0_usize, |acc, c| acc.saturating_add(c.len()))
    }
}

/// Split a payload into the cells of one row.
///
/// # Errors
///
/// Returns [`CodecError::PayloadTooLarge`] if `payload.len() >= MAX_CAPACITY`.
pub fn encode(payload: &[u8]) -> Result<CellSet, CodecError> {
    if payload.len() >= MAX_CAPACITY {
        return Err(CodecError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_CAPACITY,
        });
    }

    let mut set = CellSet::empty();
    for (slot, chunk) in payload.chunks(CELL_SIZE).enumerate() {
        set.set(slot, chunk.to_vec())?;
    }
    Ok(set)
}

/// Reassemble a payload by concatenating present cells in slot order.
pub fn decode(cells: &CellSet) -> Vec<u8> {
    let mut payload = Vec::with_capacity(cells.payload_len());
    for chunk in cells.iter().flatten() {
        payload.extend_from_slice(chunk);
    }
    payload
}
