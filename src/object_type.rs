//! Physical object silhouettes and their derived shape properties

use nalgebra::Point2;

/// Real-world planar silhouette of a trackable object class.
///
/// The contour is a closed polygon in meters. Width, height, area and
/// centroid are derived once at construction; instances are immutable and
/// meant to be created once per object class at startup.
#[derive(Debug, Clone)]
pub struct ObjectType {
    contour: Vec<Point2<f32>>,
    width: f32,
    height: f32,
    area: f32,
    centroid: Point2<f32>,
}

impl ObjectType {
    /// Build an object type from an arbitrary closed contour (meters)
    pub fn from_contour(contour: Vec<Point2<f32>>) -> Self {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for p in &contour {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        let area = polygon_area(&contour);
        let centroid = polygon_centroid(&contour);

        ObjectType {
            contour,
            width: max_x - min_x,
            height: max_y - min_y,
            area,
            centroid,
        }
    }

    /// A ball, 0.2476m in diameter
    pub fn ball() -> Self {
        let d = 0.2476;
        Self::from_contour(vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, d),
            Point2::new(d, d),
            Point2::new(d, 0.0),
        ])
    }

    /// A storage bin, 0.5842m square
    pub fn bin() -> Self {
        let s = 0.5842;
        Self::from_contour(vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, s),
            Point2::new(s, s),
            Point2::new(s, 0.0),
        ])
    }

    /// The U-shaped vision goal
    pub fn goal() -> Self {
        let max_y = 0.3048;
        Self::from_contour(vec![
            Point2::new(0.0, max_y),
            Point2::new(0.0, 0.0),
            Point2::new(0.0508, 0.0),
            Point2::new(0.0508, max_y - 0.0508),
            Point2::new(0.508 - 0.0508, max_y - 0.0508),
            Point2::new(0.508 - 0.0508, 0.0),
            Point2::new(0.508, 0.0),
            Point2::new(0.508, max_y),
        ])
    }

    /// Contour points in meters
    pub fn shape(&self) -> &[Point2<f32>] {
        &self.contour
    }

    /// Extent of the contour along x (meters)
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Extent of the contour along y (meters)
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Enclosed polygon area (square meters)
    pub fn area(&self) -> f32 {
        self.area
    }

    /// Area-weighted center of mass of the contour
    pub fn centroid(&self) -> Point2<f32> {
        self.centroid
    }
}

/// Same polygon means same type
impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.contour == other.contour
    }
}

/// Shoelace area of a closed polygon
fn polygon_area(points: &[Point2<f32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        sum += p.x * q.y - q.x * p.y;
    }
    (sum / 2.0).abs()
}

/// Area-weighted polygon centroid; degenerates to the vertex mean for
/// zero-area contours
fn polygon_centroid(points: &[Point2<f32>]) -> Point2<f32> {
    if points.is_empty() {
        return Point2::origin();
    }
    let mut signed_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        let cross = p.x * q.y - q.x * p.y;
        signed_area += cross;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    if signed_area.abs() < f32::EPSILON {
        let n = points.len() as f32;
        let mean_x: f32 = points.iter().map(|p| p.x).sum::<f32>() / n;
        let mean_y: f32 = points.iter().map(|p| p.y).sum::<f32>() / n;
        return Point2::new(mean_x, mean_y);
    }
    signed_area /= 2.0;
    Point2::new(cx / (6.0 * signed_area), cy / (6.0 * signed_area))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_ball_properties() {
        let ball = ObjectType::ball();
        assert_abs_diff_eq!(ball.width(), 0.2476, epsilon = 1e-6);
        assert_abs_diff_eq!(ball.height(), 0.2476, epsilon = 1e-6);
        assert_abs_diff_eq!(ball.area(), 0.2476 * 0.2476, epsilon = 1e-6);
        assert_abs_diff_eq!(ball.centroid().x, 0.2476 / 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ball.centroid().y, 0.2476 / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_equality_is_structural() {
        assert_eq!(ObjectType::ball(), ObjectType::ball());
        assert_ne!(ObjectType::ball(), ObjectType::bin());

        let custom = ObjectType::from_contour(vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.2476),
            Point2::new(0.2476, 0.2476),
            Point2::new(0.2476, 0.0),
        ]);
        assert_eq!(custom, ObjectType::ball());
    }

    #[test]
    fn test_goal_extent() {
        let goal = ObjectType::goal();
        assert_abs_diff_eq!(goal.width(), 0.508, epsilon = 1e-6);
        assert_abs_diff_eq!(goal.height(), 0.3048, epsilon = 1e-6);
        // U-shape encloses less than its bounding box
        assert!(goal.area() < goal.width() * goal.height());
    }
}
