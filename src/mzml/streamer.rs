//! Pull parser over `<spectrumList>`.
//!
//! Everything before the spectrum list is skipped; spectra are then produced
//! one at a time, so converter output of any size is read in bounded memory.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::binary::{decode_array, BinaryDecodeError, BinaryEncoding, CompressionType};
use super::cv_params::{CvParam, CvTerm, TimeUnit};
use super::models::MzMLSpectrum;

/// Errors that can occur during mzML parsing
#[derive(Debug, thiserror::Error)]
pub enum MzMLError {
    /// Malformed XML
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// Underlying read failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A peak array could not be decoded
    #[error("Binary decode error in spectrum {index}: {source}")]
    BinaryError {
        /// Spectrum index
        index: usize,
        /// Decode failure
        source: BinaryDecodeError,
    },

    /// Elements are missing or out of order
    #[error("Invalid mzML structure: {0}")]
    InvalidStructure(String),

    /// Attribute bytes were not UTF-8
    #[error("UTF-8 encoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListState {
    Searching,
    Reading,
    Finished,
}

/// Element kinds inside `<spectrum>` that change where a cvParam applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Precursor,
    BinaryArray,
    Other,
}

#[derive(Debug, Clone, Copy)]
enum ArrayKind {
    Mz,
    Intensity,
}

/// A `<binaryDataArray>` whose closing tag has not been seen yet
#[derive(Debug, Default)]
struct PendingArray {
    kind: Option<ArrayKind>,
    encoding: BinaryEncoding,
    compression: CompressionType,
    text: String,
}

impl PendingArray {
    fn apply(&mut self, param: &CvParam) {
        match param.term {
            CvTerm::Float32 => self.encoding = BinaryEncoding::Float32,
            CvTerm::Float64 => self.encoding = BinaryEncoding::Float64,
            CvTerm::ZlibCompression => self.compression = CompressionType::Zlib,
            CvTerm::NoCompression => self.compression = CompressionType::None,
            CvTerm::MzArray => self.kind = Some(ArrayKind::Mz),
            CvTerm::IntensityArray => self.kind = Some(ArrayKind::Intensity),
            _ => {}
        }
    }

    /// Arrays other than m/z and intensity are dropped undecoded
    fn finish(self, spectrum: &mut MzMLSpectrum) -> Result<(), MzMLError> {
        let Some(kind) = self.kind else {
            return Ok(());
        };
        if self.text.trim().is_empty() {
            return Ok(());
        }

        let values = decode_array(
            &self.text,
            self.encoding,
            self.compression,
            Some(spectrum.default_array_length),
        )
        .map_err(|source| MzMLError::BinaryError {
            index: spectrum.index,
            source,
        })?;

        match kind {
            ArrayKind::Mz => spectrum.mz = values,
            ArrayKind::Intensity => spectrum.intensity = values,
        }
        Ok(())
    }
}

/// Streaming mzML reader
pub struct MzMLStreamer<R: BufRead> {
    reader: Reader<R>,
    state: ListState,
    declared_count: Option<usize>,
    position: usize,
}

impl MzMLStreamer<BufReader<File>> {
    /// Open an mzML file for streaming
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MzMLError> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::with_capacity(64 * 1024, file)))
    }
}

impl<R: BufRead> MzMLStreamer<R> {
    /// Read mzML from any buffered source
    pub fn new(reader: R) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);

        Self {
            reader,
            state: ListState::Searching,
            declared_count: None,
            position: 0,
        }
    }

    /// `count` attribute of `<spectrumList>`, once it has been reached
    pub fn spectrum_count(&self) -> Option<usize> {
        self.declared_count
    }

    /// The next spectrum, or `None` after `</spectrumList>`
    pub fn next_spectrum(&mut self) -> Result<Option<MzMLSpectrum>, MzMLError> {
        if self.state == ListState::Searching {
            self.state = if self.find_spectrum_list()? {
                ListState::Reading
            } else {
                ListState::Finished
            };
        }
        if self.state == ListState::Finished {
            return Ok(None);
        }

        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().as_ref() == b"spectrum" => {
                    let spectrum = self.read_spectrum(&e)?;
                    self.position += 1;
                    return Ok(Some(spectrum));
                }
                Event::End(e) if e.name().as_ref() == b"spectrumList" => {
                    self.state = ListState::Finished;
                    return Ok(None);
                }
                Event::Eof => {
                    return Err(MzMLError::InvalidStructure(
                        "file ended inside spectrumList".to_string(),
                    ));
                }
                _ => {}
            }
            buf.clear();
        }
    }

    /// Iterate over the remaining spectra; iteration stops after the first error
    pub fn spectra(self) -> SpectrumIterator<R> {
        SpectrumIterator { streamer: self }
    }

    fn find_spectrum_list(&mut self) -> Result<bool, MzMLError> {
        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().as_ref() == b"spectrumList" => {
                    self.declared_count = attribute(&e, "count")?.and_then(|s| s.parse().ok());
                    return Ok(true);
                }
                Event::Empty(e) if e.name().as_ref() == b"spectrumList" => {
                    self.declared_count = Some(0);
                    return Ok(false);
                }
                Event::Eof => return Ok(false),
                _ => {}
            }
            buf.clear();
        }
    }

    fn read_spectrum(&mut self, start: &BytesStart) -> Result<MzMLSpectrum, MzMLError> {
        let mut spectrum = MzMLSpectrum {
            index: attribute(start, "index")?
                .and_then(|s| s.parse().ok())
                .unwrap_or(self.position),
            id: attribute(start, "id")?.unwrap_or_default(),
            default_array_length: attribute(start, "defaultArrayLength")?
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            ..Default::default()
        };

        let mut scopes: Vec<Scope> = Vec::new();
        let mut precursors = 0usize;
        let mut array: Option<PendingArray> = None;
        let mut buf = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let scope = match e.name().as_ref() {
                        b"precursor" => {
                            precursors += 1;
                            Scope::Precursor
                        }
                        b"binaryDataArray" => {
                            array = Some(PendingArray::default());
                            Scope::BinaryArray
                        }
                        _ => Scope::Other,
                    };
                    scopes.push(scope);
                }
                Event::Empty(e) if e.name().as_ref() == b"cvParam" => {
                    if let Some(param) = cv_param(&e)? {
                        if let Some(pending) = array.as_mut() {
                            pending.apply(&param);
                        } else if scopes.contains(&Scope::Precursor) {
                            // Only the first precursor is kept.
                            if precursors == 1 {
                                apply_precursor_param(&mut spectrum, &param);
                            }
                        } else {
                            apply_spectrum_param(&mut spectrum, &param);
                        }
                    }
                }
                Event::Text(t) => {
                    if let Some(pending) = array.as_mut() {
                        pending.text = t.unescape()?.into_owned();
                    }
                }
                Event::End(_) => match scopes.pop() {
                    None => break,
                    Some(Scope::BinaryArray) => {
                        if let Some(pending) = array.take() {
                            pending.finish(&mut spectrum)?;
                        }
                    }
                    Some(_) => {}
                },
                Event::Eof => {
                    return Err(MzMLError::InvalidStructure(format!(
                        "file ended inside spectrum {}",
                        spectrum.index
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(spectrum)
    }
}

fn apply_spectrum_param(spectrum: &mut MzMLSpectrum, param: &CvParam) {
    match param.term {
        CvTerm::MsLevel => spectrum.ms_level = param.number().map_or(0, |v| v as u8),
        CvTerm::CentroidSpectrum => spectrum.centroided = true,
        CvTerm::ProfileSpectrum => spectrum.centroided = false,
        CvTerm::PositiveScan => spectrum.positive = Some(true),
        CvTerm::NegativeScan => spectrum.positive = Some(false),
        CvTerm::ScanStartTime => {
            spectrum.scan_start = param.number().map(|v| param.unit.to_minutes(v));
        }
        CvTerm::TotalIonCurrent => spectrum.total_ion_current = param.number(),
        _ => {}
    }
}

fn apply_precursor_param(spectrum: &mut MzMLSpectrum, param: &CvParam) {
    match param.term {
        CvTerm::SelectedIonMz if spectrum.selected_ion_mz.is_none() => {
            spectrum.selected_ion_mz = param.number();
        }
        CvTerm::IsolationTargetMz => spectrum.isolation_target_mz = param.number(),
        _ => {}
    }
}

/// Iterator over spectra in an mzML file
pub struct SpectrumIterator<R: BufRead> {
    streamer: MzMLStreamer<R>,
}

impl<R: BufRead> Iterator for SpectrumIterator<R> {
    type Item = Result<MzMLSpectrum, MzMLError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.streamer.next_spectrum();
        if next.is_err() {
            self.streamer.state = ListState::Finished;
        }
        next.transpose()
    }
}

fn attribute(e: &BytesStart, name: &str) -> Result<Option<String>, MzMLError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MzMLError::XmlError(quick_xml::Error::from(e)))?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(std::str::from_utf8(&attr.value)?.to_string()));
        }
    }
    Ok(None)
}

/// A cvParam with a recognized accession; others are `None`
fn cv_param(e: &BytesStart) -> Result<Option<CvParam>, MzMLError> {
    let Some(term) = attribute(e, "accession")?.and_then(|a| CvTerm::from_accession(&a)) else {
        return Ok(None);
    };
    Ok(Some(CvParam {
        term,
        value: attribute(e, "value")?,
        unit: TimeUnit::from_accession(attribute(e, "unitAccession")?.as_deref()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TWO_SCANS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mzML xmlns="http://psi.hupo.org/ms/mzml" version="1.1.0">
  <run id="test_run">
    <spectrumList count="2">
      <spectrum index="0" id="scan=1" defaultArrayLength="2">
        <cvParam cvRef="MS" accession="MS:1000511" name="ms level" value="1"/>
        <cvParam cvRef="MS" accession="MS:1000127" name="centroid spectrum"/>
        <cvParam cvRef="MS" accession="MS:1000130" name="positive scan"/>
        <cvParam cvRef="MS" accession="MS:1000285" name="total ion current" value="300.0"/>
        <scanList count="1">
          <scan>
            <cvParam cvRef="MS" accession="MS:1000016" name="scan start time" value="60.0" unitCvRef="UO" unitAccession="UO:0000010" unitName="second"/>
          </scan>
        </scanList>
        <binaryDataArrayList count="3">
          <binaryDataArray encodedLength="24">
            <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000576" name="no compression"/>
            <cvParam cvRef="MS" accession="MS:1000514" name="m/z array"/>
            <binary>AAAAAAAAWUAAAAAAAABpQA==</binary>
          </binaryDataArray>
          <binaryDataArray encodedLength="12">
            <cvParam cvRef="MS" accession="MS:1000521" name="32-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000576" name="no compression"/>
            <cvParam cvRef="MS" accession="MS:1000515" name="intensity array"/>
            <binary>AADIQgAASEM=</binary>
          </binaryDataArray>
          <binaryDataArray encodedLength="4">
            <cvParam cvRef="MS" accession="MS:1000521" name="32-bit float"/>
            <cvParam cvRef="MS" accession="MS:1002742" name="noise array"/>
            <binary>AAAA</binary>
          </binaryDataArray>
        </binaryDataArrayList>
      </spectrum>
      <spectrum index="1" id="scan=2" defaultArrayLength="0">
        <cvParam cvRef="MS" accession="MS:1000511" name="ms level" value="2"/>
        <cvParam cvRef="MS" accession="MS:1000128" name="profile spectrum"/>
        <scanList count="1">
          <scan>
            <cvParam cvRef="MS" accession="MS:1000016" name="scan start time" value="1.5" unitCvRef="UO" unitAccession="UO:0000031" unitName="minute"/>
          </scan>
        </scanList>
        <precursorList count="2">
          <precursor spectrumRef="scan=1">
            <isolationWindow>
              <cvParam cvRef="MS" accession="MS:1000827" name="isolation window target m/z" value="176.0"/>
            </isolationWindow>
            <selectedIonList count="1">
              <selectedIon>
                <cvParam cvRef="MS" accession="MS:1000744" name="selected ion m/z" value="176.1135"/>
              </selectedIon>
            </selectedIonList>
          </precursor>
          <precursor spectrumRef="scan=1">
            <selectedIonList count="1">
              <selectedIon>
                <cvParam cvRef="MS" accession="MS:1000744" name="selected ion m/z" value="300.0"/>
              </selectedIon>
            </selectedIonList>
          </precursor>
        </precursorList>
        <binaryDataArrayList count="2">
          <binaryDataArray encodedLength="0">
            <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000514" name="m/z array"/>
            <binary/>
          </binaryDataArray>
          <binaryDataArray encodedLength="0">
            <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/>
            <cvParam cvRef="MS" accession="MS:1000515" name="intensity array"/>
            <binary/>
          </binaryDataArray>
        </binaryDataArrayList>
      </spectrum>
    </spectrumList>
  </run>
</mzML>"#;

    fn streamer(xml: &str) -> MzMLStreamer<Cursor<&[u8]>> {
        MzMLStreamer::new(Cursor::new(xml.as_bytes()))
    }

    #[test]
    fn test_first_spectrum() {
        let mut streamer = streamer(TWO_SCANS);

        let spectrum = streamer.next_spectrum().unwrap().unwrap();
        assert_eq!(streamer.spectrum_count(), Some(2));
        assert_eq!(spectrum.index, 0);
        assert_eq!(spectrum.id, "scan=1");
        assert_eq!(spectrum.ms_level, 1);
        assert_eq!(spectrum.positive, Some(true));
        assert!(spectrum.centroided);
        assert_eq!(spectrum.total_ion_current, Some(300.0));
        assert_eq!(spectrum.scan_start, Some(1.0));
        assert_eq!(spectrum.mz, vec![100.0, 200.0]);
        assert_eq!(spectrum.intensity, vec![100.0, 200.0]);
    }

    #[test]
    fn test_first_precursor_wins() {
        let spectra: Vec<_> = streamer(TWO_SCANS)
            .spectra()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(spectra.len(), 2);
        let ms2 = &spectra[1];
        assert_eq!(ms2.ms_level, 2);
        assert!(!ms2.centroided);
        assert_eq!(ms2.scan_start, Some(1.5));
        assert_eq!(ms2.isolation_target_mz, Some(176.0));
        assert_eq!(ms2.precursor_mz(), Some(176.1135));
        assert!(ms2.mz.is_empty());
    }

    #[test]
    fn test_no_spectrum_list() {
        let mut streamer = streamer(r#"<mzML><run id="r"></run></mzML>"#);
        assert!(streamer.next_spectrum().unwrap().is_none());
        assert!(streamer.next_spectrum().unwrap().is_none());
    }

    #[test]
    fn test_truncated_file_stops_iteration() {
        let cut = &TWO_SCANS[..TWO_SCANS.find("</binaryDataArrayList>").unwrap()];
        let results: Vec<_> = streamer(cut).spectra().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_array_length_mismatch() {
        let bad = TWO_SCANS.replacen(r#"defaultArrayLength="2""#, r#"defaultArrayLength="3""#, 1);
        let err = streamer(&bad).next_spectrum().unwrap_err();
        assert!(matches!(err, MzMLError::BinaryError { index: 0, .. }));
    }
}
