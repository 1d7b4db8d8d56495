use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use image::RgbaImage;

use crate::error::ThumbnailError;

/// 编码后图像的输出目标
pub trait ThumbnailSink {
    /// 日志与报告中使用的名称
    fn name(&self) -> &str;
    fn write(&mut self, png: &[u8]) -> Result<(), ThumbnailError>;
}

/// 持久化产物：固定路径，每次覆盖
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn write_file(&self, png: &[u8]) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        writer.write_all(png)?;
        writer.flush()
    }
}

impl ThumbnailSink for FileSink {
    fn name(&self) -> &str {
        "artifact"
    }

    fn write(&mut self, png: &[u8]) -> Result<(), ThumbnailError> {
        self.write_file(png).map_err(|e| ThumbnailError::SinkWrite {
            sink: format!("{} ({})", self.name(), self.path.display()),
            reason: e.to_string(),
        })
    }
}

/// 响应体缓冲：写入成功后由 HTTP 层取走
#[derive(Debug, Default)]
pub struct ResponseSink {
    body: Option<Vec<u8>>,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_body(self) -> Option<Vec<u8>> {
        self.body
    }
}

impl ThumbnailSink for ResponseSink {
    fn name(&self) -> &str {
        "response"
    }

    fn write(&mut self, png: &[u8]) -> Result<(), ThumbnailError> {
        self.body = Some(png.to_vec());
        Ok(())
    }
}

/// 单个输出目标的结果
#[derive(Debug)]
pub struct SinkOutcome {
    pub sink: String,
    pub result: Result<(), ThumbnailError>,
}

/// 一次输出的全部结果；部分成功是可接受的终态
#[derive(Debug, Default)]
pub struct EmitReport {
    pub outcomes: Vec<SinkOutcome>,
}

impl EmitReport {
    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// 取出指定目标的结果
    pub fn take(&mut self, sink: &str) -> Option<Result<(), ThumbnailError>> {
        let idx = self.outcomes.iter().position(|o| o.sink == sink)?;
        Some(self.outcomes.remove(idx).result)
    }
}

/// 使用 png crate 进行无损编码
pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>, ThumbnailError> {
    let (width, height) = canvas.dimensions();
    let mut out = Vec::with_capacity((width * height) as usize);
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Default);
        encoder.set_filter(png::FilterType::Paeth);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(canvas.as_raw())?;
        writer.finish()?;
    }
    Ok(out)
}

/// 编码一次，然后依次写入每个输出目标。
///
/// 各目标互不影响：任一目标失败只记录并告警，其余照常写入，不重试。
/// 编码失败时所有目标都记为编码失败。
pub fn emit(canvas: &RgbaImage, sinks: &mut [&mut dyn ThumbnailSink]) -> EmitReport {
    let mut report = EmitReport::default();
    let t_encode = std::time::Instant::now();
    let encoded = encode_png(canvas);
    if let Ok(bytes) = &encoded {
        tracing::info!("PNG 编码完成: {}B, 耗时={:?}", bytes.len(), t_encode.elapsed());
    }

    for sink in sinks.iter_mut() {
        let name = sink.name().to_string();
        let result = match &encoded {
            Ok(bytes) => sink.write(bytes),
            Err(ThumbnailError::Encode(msg)) => Err(ThumbnailError::Encode(msg.clone())),
            Err(e) => Err(ThumbnailError::Encode(e.to_string())),
        };
        match &result {
            Ok(()) => tracing::debug!("缩略图已写入 {}", name),
            Err(e) => tracing::warn!("缩略图写入 {} 失败: {}", name, e),
        }
        report.outcomes.push(SinkOutcome { sink: name, result });
    }

    if let Err(e) = &encoded {
        tracing::error!("缩略图编码失败: {}", e);
    }
    report
}
