//! Landmark topologies for the face mesh and hand skeleton.

use image::Rgba;

pub const FACE_OVAL: &[usize] = &[
    10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377, 152,
    148, 176, 149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109, 10,
];
pub const LIPS_OUTER_LOWER: &[usize] = &[61, 146, 91, 181, 84, 17, 314, 405, 321, 375, 291];
pub const LIPS_OUTER_UPPER: &[usize] = &[61, 185, 40, 39, 37, 0, 267, 269, 270, 409, 291];
pub const RIGHT_EYE_LOWER: &[usize] = &[33, 7, 163, 144, 145, 153, 154, 155, 133];
pub const RIGHT_EYE_UPPER: &[usize] = &[33, 246, 161, 160, 159, 158, 157, 173, 133];
pub const LEFT_EYE_LOWER: &[usize] = &[263, 249, 390, 373, 374, 380, 381, 382, 362];
pub const LEFT_EYE_UPPER: &[usize] = &[263, 466, 388, 387, 386, 385, 384, 398, 362];
pub const LIPS_INNER_LOWER: &[usize] = &[78, 95, 88, 178, 87, 14, 317, 402, 318, 324, 308];
pub const LIPS_INNER_UPPER: &[usize] = &[78, 191, 80, 81, 82, 13, 312, 311, 310, 415, 308];
pub const RIGHT_EYEBROW_LOWER: &[usize] = &[46, 53, 52, 65, 55];
pub const RIGHT_EYEBROW_UPPER: &[usize] = &[70, 63, 105, 66, 107];
pub const LEFT_EYEBROW_LOWER: &[usize] = &[276, 283, 282, 295, 285];
pub const LEFT_EYEBROW_UPPER: &[usize] = &[300, 293, 334, 296, 336];
/// Iris rings only exist in the 478-point mesh.
pub const RIGHT_IRIS: &[usize] = &[469, 470, 471, 472, 469];
pub const LEFT_IRIS: &[usize] = &[474, 475, 476, 477, 474];

pub const HAND_CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (5, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (9, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (13, 17),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

pub const FACE_CONTOUR_COLOR: Rgba<u8> = Rgba([0xE0, 0xE0, 0xE0, 0xFF]);
pub const RIGHT_EYE_COLOR: Rgba<u8> = Rgba([0xFF, 0x30, 0x30, 0xFF]);
pub const LEFT_EYE_COLOR: Rgba<u8> = Rgba([0x30, 0xFF, 0x30, 0xFF]);
pub const OBJECT_COLOR: Rgba<u8> = Rgba([0xFF, 0x00, 0x00, 0xFF]);
pub const HAND_CONNECTION_COLOR: Rgba<u8> = Rgba([0x00, 0xFF, 0x00, 0xFF]);
pub const HAND_POINT_COLOR: Rgba<u8> = Rgba([0xFF, 0x00, 0x00, 0xFF]);

/// Face contours drawn by the face mesh layer, with their colours.
pub fn face_contours() -> [(&'static [usize], Rgba<u8>); 15] {
    [
        (FACE_OVAL, FACE_CONTOUR_COLOR),
        (LIPS_OUTER_LOWER, FACE_CONTOUR_COLOR),
        (LIPS_OUTER_UPPER, FACE_CONTOUR_COLOR),
        (LIPS_INNER_LOWER, FACE_CONTOUR_COLOR),
        (LIPS_INNER_UPPER, FACE_CONTOUR_COLOR),
        (RIGHT_EYE_LOWER, RIGHT_EYE_COLOR),
        (RIGHT_EYE_UPPER, RIGHT_EYE_COLOR),
        (RIGHT_EYEBROW_LOWER, RIGHT_EYE_COLOR),
        (RIGHT_EYEBROW_UPPER, RIGHT_EYE_COLOR),
        (RIGHT_IRIS, RIGHT_EYE_COLOR),
        (LEFT_EYE_LOWER, LEFT_EYE_COLOR),
        (LEFT_EYE_UPPER, LEFT_EYE_COLOR),
        (LEFT_EYEBROW_LOWER, LEFT_EYE_COLOR),
        (LEFT_EYEBROW_UPPER, LEFT_EYE_COLOR),
        (LEFT_IRIS, LEFT_EYE_COLOR),
    ]
}

/// Consecutive landmark pairs along a contour path.
pub fn path_edges(path: &'static [usize]) -> impl Iterator<Item = (usize, usize)> {
    path.windows(2).map(|pair| (pair[0], pair[1]))
}
