/// BlazeFace face detector using ONNX Runtime via `ort`.
///
/// The short-range model only sees a 128×128 input, so small faces in large
/// images are searched with a pyramid of overlapping square windows. Raw
/// hits from every window are pooled and handed to the candidate grouper,
/// which applies the `min_neighbors` rule.
use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::candidate_grouper::{Candidate, CandidateGrouper};
use crate::detection::domain::face_detector::{DetectionError, DetectionParams, FaceDetector};
use crate::shared::onnx_session::build_session;
use crate::shared::raster::Raster;
use crate::shared::region::FaceRegion;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Default confidence threshold for a single anchor.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Windows smaller than this are not searched.
const MIN_WINDOW: u32 = 96;

/// Upper bound on pyramid depth, including the full-frame level.
const MAX_LEVELS: usize = 4;

/// BlazeFace face detector backed by an ONNX Runtime session.
pub struct OnnxBlazefaceDetector {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
    grouper: CandidateGrouper,
}

impl OnnxBlazefaceDetector {
    /// Load a BlazeFace ONNX model.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, DetectionError> {
        let session = build_session(model_path).map_err(DetectionError::ModelLoad)?;
        Ok(Self {
            session: Mutex::new(session),
            confidence,
            anchors: generate_anchors(),
            grouper: CandidateGrouper::default(),
        })
    }

    fn detect_in_window(
        &self,
        raster: &Raster,
        window: &Window,
    ) -> Result<Vec<Candidate>, DetectionError> {
        let input_tensor = preprocess(raster, window, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input_tensor)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("detector session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        // BlazeFace outputs two tensors:
        // - regressors: [1, 896, 16] (box deltas + keypoints)
        // - classificators: [1, 896, 1] (confidence scores)
        if outputs.len() < 2 {
            return Err(DetectionError::Inference(format!(
                "BlazeFace model expected 2 outputs, got {}",
                outputs.len()
            )));
        }
        let regressors = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let scores = outputs[1]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let reg_data = regressors
            .as_slice()
            .ok_or_else(|| DetectionError::Inference("cannot get regressor slice".into()))?;
        let score_data = scores
            .as_slice()
            .ok_or_else(|| DetectionError::Inference("cannot get score slice".into()))?;

        Ok(decode_candidates(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence as f32,
            window,
        ))
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(
        &self,
        raster: &Raster,
        params: &DetectionParams,
    ) -> Result<Vec<FaceRegion>, DetectionError> {
        params.validate()?;

        let windows = pyramid_windows(raster.width(), raster.height(), params.scale_factor);
        let per_window = windows
            .iter()
            .map(|window| self.detect_in_window(raster, window))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(merge_window_candidates(
            &self.grouper,
            per_window,
            params.min_neighbors,
            raster.width(),
            raster.height(),
        ))
    }
}

/// Pool the hits of every window and keep the groups with at least
/// `min_neighbors` members.
fn merge_window_candidates(
    grouper: &CandidateGrouper,
    per_window: Vec<Vec<Candidate>>,
    min_neighbors: usize,
    width: u32,
    height: u32,
) -> Vec<FaceRegion> {
    let window_count = per_window.len();
    let candidates: Vec<Candidate> = per_window.into_iter().flatten().collect();
    log::debug!(
        "BlazeFace: {window_count} windows, {} raw candidates",
        candidates.len()
    );
    grouper.group(&candidates, min_neighbors, width, height)
}

// ---------------------------------------------------------------------------
// Window pyramid
// ---------------------------------------------------------------------------

/// A rectangular area of the raster fed to the model as one input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Window {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Full frame first, then square windows shrinking by `scale_factor` per
/// level with 50% overlap, until windows drop below `MIN_WINDOW`.
fn pyramid_windows(width: u32, height: u32, scale_factor: f64) -> Vec<Window> {
    let mut windows = vec![Window {
        x: 0,
        y: 0,
        width,
        height,
    }];

    let short_side = width.min(height) as f64;
    for level in 1..MAX_LEVELS {
        let side = (short_side / scale_factor.powi(level as i32)).round() as u32;
        if side < MIN_WINDOW {
            break;
        }
        let stride = (side / 2).max(1);
        for &y in &axis_offsets(height, side, stride) {
            for &x in &axis_offsets(width, side, stride) {
                windows.push(Window {
                    x,
                    y,
                    width: side,
                    height: side,
                });
            }
        }
    }
    windows
}

/// Window start positions along one axis; the last window is flush with the end.
fn axis_offsets(extent: u32, side: u32, stride: u32) -> Vec<u32> {
    if side >= extent {
        return vec![0];
    }
    let last = extent - side;
    let mut offsets: Vec<u32> = (0..=last).step_by(stride as usize).collect();
    if offsets.last() != Some(&last) {
        offsets.push(last);
    }
    offsets
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize a raster window to `size × size`, normalize to [0,1], and
/// replicate the intensity channel into NCHW float32 RGB.
fn preprocess(raster: &Raster, window: &Window, size: u32) -> ndarray::Array4<f32> {
    let s = size as usize;
    let win_w = window.width.min(raster.width() - window.x) as f64;
    let win_h = window.height.min(raster.height() - window.y) as f64;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * win_h / s as f64) as u32).min(win_h as u32 - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * win_w / s as f64) as u32).min(win_w as u32 - 1);
            let value = raster.sample(window.x + src_x, window.y + src_y) as f32 / 255.0;
            for c in 0..3 {
                tensor[[0, c, y, x]] = value;
            }
        }
    }

    tensor
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Turn raw model outputs into candidates in raster coordinates.
fn decode_candidates(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    window: &Window,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let num_anchors = anchors.len().min(NUM_ANCHORS);
    let input = INPUT_SIZE as f32;

    for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }

        let reg_offset = i * 16;
        if reg_offset + 4 > reg_data.len() {
            break;
        }

        let anchor = &anchors[i];
        let cx = anchor[0] + reg_data[reg_offset] / input;
        let cy = anchor[1] + reg_data[reg_offset + 1] / input;
        let w = reg_data[reg_offset + 2] / input;
        let h = reg_data[reg_offset + 3] / input;

        let ww = window.width as f64;
        let wh = window.height as f64;
        candidates.push(Candidate {
            x1: window.x as f64 + (cx - w / 2.0) as f64 * ww,
            y1: window.y as f64 + (cy - h / 2.0) as f64 * wh,
            x2: window.x as f64 + (cx + w / 2.0) as f64 * ww,
            y2: window.y as f64 + (cy + h / 2.0) as f64 * wh,
            score: score as f64,
        });
    }

    candidates
}

/// Generate BlazeFace anchors for the short-range model.
///
/// The short-range model uses two feature map sizes: 16×16 and 8×8,
/// with 2 and 6 anchors per cell respectively.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn full(width: u32, height: u32) -> Window {
        Window {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    #[test]
    fn test_preprocess_shape() {
        let raster = Raster::new(vec![128u8; 200 * 100], 200, 100);
        let tensor = preprocess(&raster, &full(200, 100), INPUT_SIZE);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_preprocess_normalized_and_replicated() {
        let raster = Raster::new(vec![255u8; 50 * 50], 50, 50);
        let tensor = preprocess(&raster, &full(50, 50), INPUT_SIZE);
        for c in 0..3 {
            assert_relative_eq!(tensor[[0, c, 0, 0]], 1.0);
        }
    }

    #[test]
    fn test_preprocess_reads_inside_window_only() {
        // left half black, right half white
        let mut data = vec![0u8; 200 * 100];
        for row in data.chunks_mut(200) {
            row[100..].fill(255);
        }
        let raster = Raster::new(data, 200, 100);
        let window = Window {
            x: 100,
            y: 0,
            width: 100,
            height: 100,
        };
        let tensor = preprocess(&raster, &window, INPUT_SIZE);
        assert!(tensor.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_generate_anchors_count() {
        // 16×16 grid × 2 anchors + 8×8 grid × 6 anchors = 512 + 384 = 896
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_sigmoid_zero() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
    }

    #[test]
    fn test_small_raster_uses_full_frame_only() {
        let windows = pyramid_windows(120, 120, 1.3);
        assert_eq!(windows, vec![full(120, 120)]);
    }

    #[test]
    fn test_pyramid_starts_with_full_frame() {
        let windows = pyramid_windows(640, 480, 1.3);
        assert_eq!(windows[0], full(640, 480));
        assert!(windows.len() > 1);
    }

    #[test]
    fn test_pyramid_windows_stay_inside_raster() {
        for w in pyramid_windows(641, 479, 1.3) {
            assert!(w.x + w.width <= 641);
            assert!(w.y + w.height <= 479);
        }
    }

    #[test]
    fn test_scale_factor_sets_first_window_size() {
        assert_eq!(pyramid_windows(1024, 1024, 2.0)[1].width, 512);
        assert_eq!(pyramid_windows(1024, 1024, 1.3)[1].width, 788);
    }

    // --- Merging window hits ---

    fn hit(x: f64, y: f64, side: f64) -> Candidate {
        Candidate {
            x1: x,
            y1: y,
            x2: x + side,
            y2: y + side,
            score: 0.9,
        }
    }

    /// One hit per window for the first `hits` windows of a 640×480 pyramid.
    fn spread_hits(hits: usize, make: impl Fn(usize) -> Candidate) -> Vec<Vec<Candidate>> {
        pyramid_windows(640, 480, 1.3)
            .iter()
            .enumerate()
            .map(|(i, _)| if i < hits { vec![make(i)] } else { Vec::new() })
            .collect()
    }

    #[rstest]
    #[case::below_threshold(4, 0)]
    #[case::at_threshold(5, 1)]
    #[case::above_threshold(8, 1)]
    fn test_merge_requires_min_neighbors_across_windows(
        #[case] hits: usize,
        #[case] expected_faces: usize,
    ) {
        let per_window = spread_hits(hits, |i| hit(200.0 + i as f64, 150.0, 80.0));
        assert!(per_window.len() > hits);
        let faces =
            merge_window_candidates(&CandidateGrouper::default(), per_window, 5, 640, 480);
        assert_eq!(faces.len(), expected_faces);
    }

    #[test]
    fn test_merge_keeps_only_well_supported_face() {
        let mut per_window = spread_hits(6, |_| hit(200.0, 150.0, 80.0));
        for hits in per_window.iter_mut().skip(10).take(3) {
            hits.push(hit(450.0, 300.0, 60.0));
        }
        let faces =
            merge_window_candidates(&CandidateGrouper::default(), per_window, 5, 640, 480);
        assert_eq!(faces, vec![FaceRegion::new(200, 150, 80, 80)]);
    }

    #[test]
    fn test_merge_without_hits_is_empty() {
        let per_window = vec![Vec::new(); pyramid_windows(640, 480, 1.3).len()];
        assert!(
            merge_window_candidates(&CandidateGrouper::default(), per_window, 5, 640, 480)
                .is_empty()
        );
    }

    #[test]
    fn test_axis_offsets_flush_with_end() {
        assert_eq!(axis_offsets(100, 40, 20), vec![0, 20, 40, 60]);
        assert_eq!(axis_offsets(105, 40, 20), vec![0, 20, 40, 60, 65]);
        assert_eq!(axis_offsets(30, 40, 20), vec![0]);
    }

    #[test]
    fn test_decode_maps_into_window_coordinates() {
        let anchors = vec![[0.5f32, 0.5f32]];
        // zero offsets, box half the window wide and tall
        let mut reg = vec![0.0f32; 16];
        reg[2] = 64.0;
        reg[3] = 64.0;
        let scores = vec![10.0f32];
        let window = Window {
            x: 100,
            y: 50,
            width: 200,
            height: 200,
        };
        let candidates = decode_candidates(&reg, &scores, &anchors, 0.5, &window);
        assert_eq!(candidates.len(), 1);
        let c = candidates[0];
        assert_relative_eq!(c.x1, 150.0, epsilon = 1e-4);
        assert_relative_eq!(c.y1, 100.0, epsilon = 1e-4);
        assert_relative_eq!(c.x2, 250.0, epsilon = 1e-4);
        assert_relative_eq!(c.y2, 200.0, epsilon = 1e-4);
    }

    #[test]
    fn test_decode_skips_low_scores() {
        let anchors = vec![[0.5f32, 0.5f32]];
        let reg = vec![0.0f32; 16];
        let scores = vec![-10.0f32];
        let candidates = decode_candidates(&reg, &scores, &anchors, 0.5, &full(128, 128));
        assert!(candidates.is_empty());
    }
}
