#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(gif) = gifanim::read_gif(data, gifanim::ChannelOrder::Rgba) else {
        return;
    };
    let Ok(mut player) = gifanim::FrameCompositor::new(&gif) else {
        return;
    };
    for _ in 0..player.frame_count().min(64) {
        let _ = player.render_current_frame();
        let _ = player.current_delay_ms();
        player.advance();
    }
});
