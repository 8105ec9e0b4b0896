//! 在圓盤內均勻取樣的隨機座標。
//!
//! 經度位移沒有依緯度縮放，高緯度時實際範圍在東西方向會略窄於半徑。
//! 目前搜尋流程不使用這個座標。

use rand::Rng;
use std::f64::consts::TAU;

/// 一度約等於的公尺數
pub const METERS_PER_DEGREE: f64 = 111_000.0;

pub fn sample_point<R: Rng + ?Sized>(
    rng: &mut R,
    latitude: f64,
    longitude: f64,
    radius_meters: f64,
) -> (f64, f64) {
    let radius_deg = radius_meters / METERS_PER_DEGREE;
    // sqrt 讓點在面積上均勻分佈
    let distance = rng.random::<f64>().sqrt() * radius_deg;
    let angle = rng.random_range(0.0..TAU);

    (
        latitude + distance * angle.cos(),
        longitude + distance * angle.sin(),
    )
}

pub fn random_point_in_radius(latitude: f64, longitude: f64, radius_meters: f64) -> (f64, f64) {
    sample_point(&mut rand::rng(), latitude, longitude, radius_meters)
}
