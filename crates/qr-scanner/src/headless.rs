//! 카메라/디코더가 없는 호스트용 협력자
//!
//! CLI처럼 수동 입력만 받는 환경에서 [`QrScanner`](crate::QrScanner)를 구성할 때 사용합니다.

use tracelink_core::error::DeviceError;
use tracelink_core::pipeline::{CameraDevice, FrameDecoder, VideoStream};
use tracelink_core::types::{CameraFacing, Frame};

/// 카메라가 없는 장치. 획득은 항상 `NotFound`입니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

/// 만들어질 수 없는 스트림
#[derive(Debug)]
pub enum NoStream {}

impl VideoStream for NoStream {
    fn has_enough_data(&self) -> bool {
        match *self {}
    }

    fn capture_frame(&mut self) -> Option<Frame> {
        match *self {}
    }

    fn stop(&mut self) {
        match *self {}
    }
}

impl CameraDevice for NoCamera {
    type Stream = NoStream;

    async fn acquire(&self, _facing: CameraFacing) -> Result<NoStream, DeviceError> {
        Err(DeviceError::NotFound("no camera attached to this host".to_owned()))
    }
}

/// 코드를 찾지 못하는 디코더
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecoder;

impl FrameDecoder for NoDecoder {
    fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Option<String> {
        None
    }
}
