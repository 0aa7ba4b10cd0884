mod common;

use omr_engine::geometry::PixelPoint;
use omr_engine::glyph::{Glyph, GlyphId, Orientation};
use omr_engine::image::BinaryImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random blob: a noisy stick of random direction plus scattered neighbours.
fn random_glyph(rng: &mut StdRng, id: u32) -> (Glyph, Vec<PixelPoint>) {
    let (x0, y0) = (rng.random_range(10..40), rng.random_range(10..40));
    let length = rng.random_range(2..60);
    let (dx, dy) = (rng.random_range(-3..4), rng.random_range(-3..4));
    let mut pixels = Vec::new();
    for k in 0..length {
        let x = x0 + k * dx / 3 + rng.random_range(0..2);
        let y = y0 + k * dy / 3 + rng.random_range(0..2);
        pixels.push(PixelPoint::new(x, y));
        if rng.random_bool(0.3) {
            pixels.push(PixelPoint::new(x + 1, y));
        }
    }
    let neighbours = (0..rng.random_range(0..40))
        .map(|_| PixelPoint::new(rng.random_range(0..100), rng.random_range(0..100)))
        .collect();
    (Glyph::new(GlyphId(id), pixels).unwrap(), neighbours)
}

#[test]
fn length_and_stuck_count_fit_in_the_half_perimeter() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut checked = 0;
    for id in 0..2_000 {
        let (glyph, neighbours) = random_glyph(&mut rng, id);
        let Ok(orientation) = glyph.orientation() else {
            continue;
        };
        let raster = BinaryImage::from_points(
            128,
            128,
            glyph.pixels().iter().chain(neighbours.iter()),
        );
        let (first, last) = glyph.stuck_counts(&raster).unwrap();
        let b = glyph.bounds();
        let length = glyph.length(orientation);
        for stuck in [first, last] {
            assert!(
                length as usize + stuck <= (b.width + b.height) as usize,
                "{} length={length} stuck={stuck} box={b:?}",
                glyph.id()
            );
        }
        assert!(first <= glyph.thickness(orientation) as usize);
        assert!(last <= glyph.thickness(orientation) as usize);
        checked += 1;
    }
    assert!(checked > 1_500);
}

#[test]
fn orientation_flips_at_forty_five_degrees() {
    let shallow: Vec<PixelPoint> = (0..40).map(|k| PixelPoint::new(k, k * 9 / 10)).collect();
    let steep: Vec<PixelPoint> = (0..40).map(|k| PixelPoint::new(k * 9 / 10, k)).collect();
    let a = Glyph::new(GlyphId(0), shallow).unwrap();
    let b = Glyph::new(GlyphId(1), steep).unwrap();
    assert_eq!(a.orientation().unwrap(), Orientation::Horizontal);
    assert_eq!(b.orientation().unwrap(), Orientation::Vertical);
    assert_eq!(a.length(Orientation::Horizontal), 40);
    assert_eq!(b.length(Orientation::Vertical), 40);
}
