#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Malformed input must surface as an error, never a panic.
    let streamer = ms_sentry::mzml::MzMLStreamer::new(Cursor::new(data));

    for parsed in streamer.spectra().take(100) {
        match parsed {
            Ok(spectrum) => {
                let spectrum = spectrum.into_spectrum();
                let _ = spectrum.validate();
                let _ = spectrum.tic();
            }
            Err(_) => break,
        }
    }
});
