use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ms_sentry::acquisition::AcquisitionFile;
use ms_sentry::atlas::CompoundAtlas;
use ms_sentry::extraction::{
    collect_ms1_peaks, extract_ms1, extracted_ion_chromatogram, pick_apex, ExtractionConfig,
};
use ms_sentry::spectra::Spectrum;

/// A synthetic 15-minute MS1 run with the internal standards eluting near their atlas RTs
fn synthetic_run(num_scans: usize, peaks_per_scan: usize) -> Vec<Spectrum> {
    let standards = [(176.1135, 9.0), (229.9811, 5.0), (218.1281, 10.0), (117.0484, 5.0)];

    (0..num_scans)
        .map(|i| {
            let rt = i as f64 * 15.0 / num_scans as f64;
            let mut mz = Vec::with_capacity(peaks_per_scan + standards.len());
            let mut intensity = Vec::with_capacity(peaks_per_scan + standards.len());
            for j in 0..peaks_per_scan {
                mz.push(70.0 + j as f64 * 1050.0 / peaks_per_scan as f64 + (j as f64 * 0.37).sin() * 0.01);
                intensity.push(1.0e4 * (1.0 + (j as f64 * 0.91).sin().abs()));
            }
            for (target, center) in standards {
                let shape = (-(rt - center).powi(2) / 0.02).exp();
                mz.push(target + 0.0003);
                intensity.push(1.0e7 * shape);
            }
            Spectrum {
                index: i,
                ms_level: 1,
                retention_time: rt,
                mz,
                intensity,
                centroided: true,
                ..Default::default()
            }
        })
        .collect()
}

/// Benchmark a single EIC plus apex over flattened MS1 arrays
fn bench_eic(c: &mut Criterion) {
    let mut group = c.benchmark_group("eic");

    for num_scans in [1_000, 5_000] {
        let peaks_per_scan = 200;
        let ms1 = extract_ms1(&synthetic_run(num_scans, peaks_per_scan));
        group.throughput(Throughput::Elements(ms1.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("rt_window", format!("{}scans", num_scans)),
            &ms1,
            |b, ms1| {
                b.iter(|| {
                    let eic = extracted_ion_chromatogram(
                        black_box(ms1),
                        176.1135,
                        0.0015,
                        Some(9.0),
                        2.0,
                    );
                    pick_apex(&eic)
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("no_rt_window", format!("{}scans", num_scans)),
            &ms1,
            |b, ms1| {
                b.iter(|| {
                    let eic = extracted_ion_chromatogram(black_box(ms1), 176.1135, 0.0015, None, 2.0);
                    pick_apex(&eic)
                })
            },
        );
    }

    group.finish();
}

/// Benchmark full per-file MS1 peak collection against the built-in atlas
fn bench_collect_peaks(c: &mut Criterion) {
    let spectra = synthetic_run(3_000, 200);
    let atlas = CompoundAtlas::builtin_internal_standards();
    let config = ExtractionConfig::default();
    let mut file = AcquisitionFile::new(
        "20240312_JGI_MD_507130_BioSoil_QE139_20240312_C18_USDAY59554_FPS_MS1_0_QC_Post_Opt_1.raw",
    )
    .unwrap();
    file.attach_spectra(&spectra);

    c.bench_function("collect_ms1_peaks_fps", |b| {
        b.iter(|| {
            let ms1 = file.ms1().unwrap();
            collect_ms1_peaks(black_box(&file), ms1, &atlas, &config)
        })
    });
}

criterion_group!(benches, bench_eic, bench_collect_peaks);
criterion_main!(benches);
