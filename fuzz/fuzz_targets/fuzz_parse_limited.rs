#![no_main]
use gifanim::{DecodeConfig, FrameCompositor, read_gif_with_config};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let config = DecodeConfig::default()
        .with_peak_memory_limit(4_000_000)
        .with_total_megapixels_limit(4)
        .with_max_animation_frames(32);
    if let Ok(gif) = read_gif_with_config(data, &config) {
        if let Ok(mut player) = FrameCompositor::new(&gif) {
            for i in 0..gif.frame_count() {
                let _ = player.render_frame(i);
            }
        }
    }
});
