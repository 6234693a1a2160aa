//! # mzML Reader
//!
//! Streaming parsing of mzML, the HUPO-PSI XML format most vendor converters
//! emit, reduced to what peak extraction needs: MS level, scan time, centroid
//! flag, TIC, selected precursor and the m/z and intensity arrays.
//!
//! ## mzML Structure
//!
//! ```text
//! indexedmzML (optional wrapper)
//! └── mzML
//!     └── run
//!         └── spectrumList
//!             └── spectrum* (many)
//!                 ├── cvParam*
//!                 ├── scanList
//!                 ├── precursorList (for MS2+)
//!                 └── binaryDataArrayList
//!                     └── binaryDataArray*
//!                         ├── cvParam* (encoding info)
//!                         └── binary (base64 data)
//! ```

mod binary;
mod cv_params;
mod models;
mod source;
mod streamer;

pub use binary::{decode_array, BinaryDecodeError, BinaryEncoding, CompressionType};
pub use cv_params::{CvParam, CvTerm, TimeUnit};
pub use models::MzMLSpectrum;
pub use source::{
    read_mzml, ConverterCommand, MzMLSpectralSource, DEFAULT_CONVERTER_ARGS,
    INPUT_PLACEHOLDER, OUTPUT_DIR_PLACEHOLDER,
};
pub use streamer::{MzMLError, MzMLStreamer, SpectrumIterator};
