pub mod cursor;
pub mod layout;
pub mod markers;
pub mod scale;
pub mod tween;
