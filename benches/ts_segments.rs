//! Benchmarks for MPEG-TS segment writing
//!
//! Measures packetizing throughput for typical access unit sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hlsvault_common::{AudioCodec, VideoCodec};
use hlsvault_media::{AudioFrame, ContinuityState, SegmentWriter, Tracks, VideoFrame};

fn bench_video_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_video");
    let tracks = Tracks::video(VideoCodec::H264, Some(AudioCodec::Aac));

    for size in [1_000usize, 20_000, 200_000] {
        let frame = VideoFrame::new(40, true, vec![0x65; size]);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            let mut cc = ContinuityState::new();
            b.iter(|| {
                let mut writer =
                    SegmentWriter::begin(Vec::with_capacity(size * 2), tracks, &mut cc).unwrap();
                writer.write_video(black_box(frame), &mut cc).unwrap();
                writer.end().unwrap()
            });
        });
    }

    group.finish();
}

fn bench_audio_segment(c: &mut Criterion) {
    let tracks = Tracks::audio_only(AudioCodec::Aac);
    // Ten seconds of AAC at ~43 frames per second.
    let frames: Vec<AudioFrame> = (0..430u32)
        .map(|i| AudioFrame::new(i * 23, vec![0x21; 370]))
        .collect();

    c.bench_function("audio_segment_10s", |b| {
        let mut cc = ContinuityState::new();
        b.iter(|| {
            let mut writer = SegmentWriter::begin(Vec::new(), tracks, &mut cc).unwrap();
            for frame in &frames {
                writer.write_audio(black_box(frame), &mut cc).unwrap();
            }
            writer.end().unwrap()
        });
    });
}

criterion_group!(benches, bench_video_frames, bench_audio_segment);
criterion_main!(benches);
