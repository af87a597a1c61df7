use image::{imageops::FilterType, GenericImageView, Rgb, RgbImage};
use std::env;
use std::path::Path;

/// Colors the panels can show; every pixel of the frame is snapped to one of them
const PALETTE: [Rgb<u8>; 3] = [Rgb([255, 255, 255]), Rgb([0, 0, 0]), Rgb([255, 0, 0])];

// 4.2" panels, landscape
const FRAME_WIDTH: u32 = 400;
const FRAME_HEIGHT: u32 = 300;

fn nearest(pixel: Rgb<u8>) -> Rgb<u8> {
    let distance = |color: &Rgb<u8>| -> u32 {
        pixel
            .0
            .iter()
            .zip(color.0.iter())
            .map(|(a, b)| (i32::from(*a) - i32::from(*b)).pow(2) as u32)
            .sum()
    };
    PALETTE
        .iter()
        .min_by_key(|color| distance(color))
        .copied()
        .unwrap_or(PALETTE[0])
}

/// White frame with a black border, a black diagonal and a red band
fn placeholder(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let border = x < 4 || y < 4 || x >= width - 4 || y >= height - 4;
        let diagonal = x * height / width == y;
        let band = (height * 2 / 5..height * 3 / 5).contains(&y) && (width / 4..width * 3 / 4).contains(&x);
        if border || diagonal {
            PALETTE[1]
        } else if band {
            PALETTE[2]
        } else {
            PALETTE[0]
        }
    })
}

/// Fit `input_path` into the frame on a white background and snap it to the palette
fn prepare_frame(
    input_path: &str,
    output_path: &Path,
    target_width: u32,
    target_height: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed={}", input_path);

    if !Path::new(input_path).exists() {
        println!("cargo:warning=Image file '{}' not found, embedding placeholder frame", input_path);
        placeholder(target_width, target_height).save(output_path)?;
        return Ok(());
    }

    let img = image::open(input_path)?;
    let (orig_width, orig_height) = img.dimensions();
    let orig_ratio = orig_width as f32 / orig_height as f32;
    let target_ratio = target_width as f32 / target_height as f32;

    let (new_width, new_height) = if orig_ratio > target_ratio {
        // Image is wider than target - fit to width
        (target_width, (target_width as f32 / orig_ratio) as u32)
    } else {
        // Image is taller than target - fit to height
        ((target_height as f32 * orig_ratio) as u32, target_height)
    };
    let resized = img.resize(new_width, new_height, FilterType::Lanczos3).to_rgb8();

    let offset_x = (target_width - resized.width()) / 2;
    let offset_y = (target_height - resized.height()) / 2;
    let frame = RgbImage::from_fn(target_width, target_height, |x, y| {
        match (x.checked_sub(offset_x), y.checked_sub(offset_y)) {
            (Some(ix), Some(iy)) if ix < resized.width() && iy < resized.height() => {
                nearest(*resized.get_pixel(ix, iy))
            }
            _ => PALETTE[0],
        }
    });

    frame.save(output_path)?;
    println!(
        "cargo:warning=Frame {}x{} from {} ({}x{}) saved to {}",
        target_width,
        target_height,
        input_path,
        orig_width,
        orig_height,
        output_path.display()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    let out_dir = env::var("OUT_DIR")?;
    let frame_output = Path::new(&out_dir).join("frame.png");
    prepare_frame("frame.png", &frame_output, FRAME_WIDTH, FRAME_HEIGHT)?;

    println!("cargo:rerun-if-changed=frame.png");
    Ok(())
}
