//! Inspect GIF structure and play every frame once
use gifanim::{DecodeConfig, FrameCompositor, read_gif_from_reader};
use std::env;
use std::fs::File;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <gif-file>", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    let mut f = File::open(path).expect("Failed to open file");

    let gif = match read_gif_from_reader(&mut f, &DecodeConfig::default()) {
        Ok(gif) => gif,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            std::process::exit(1);
        }
    };

    let screen = gif.screen();
    println!("File: {}", path);
    println!("Version: {:?}", gif.version());
    println!("Screen: {}x{}", screen.width, screen.height);
    if let Some(table) = gif.global_color_table() {
        println!("Global color table: {} entries", table.len());
    }
    if let Some(ratio) = screen.pixel_aspect_ratio() {
        println!("Pixel aspect ratio: {:.3}", ratio);
    }
    for comment in gif.comments() {
        println!("Comment: {}", String::from_utf8_lossy(comment));
    }

    let mut player = FrameCompositor::new(&gif).expect("Failed to allocate canvas");
    if player.is_animated() {
        println!("\n=== Animation ===");
        match player.loop_count().and_then(|l| l.total_plays()) {
            Some(plays) => println!("Plays: {}", plays),
            None => println!("Plays: forever"),
        }
    } else {
        println!("\nNo animation (static image)");
    }

    let mut total_ms = 0u64;
    for i in 0..player.frame_count() {
        let frame = &gif.frames()[i];
        let delay = player.current_delay_ms();
        total_ms += u64::from(delay);
        match player.render_current_frame() {
            Ok(pixels) => {
                let opaque = pixels.chunks_exact(4).filter(|px| px[3] == 0xff).count();
                println!(
                    "  Frame {}: {}x{}+{}+{} {:?} {} ms, {} opaque pixels",
                    i, frame.width, frame.height, frame.left, frame.top, frame.disposal(), delay, opaque
                );
            }
            Err(e) => println!("  Frame {}: render error: {}", i, e),
        }
        player.advance();
    }

    if player.is_animated() {
        println!("\nTotal duration: {} ms ({:.2} seconds)", total_ms, total_ms as f64 / 1000.0);
    }
}
