use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use super::config::TranscodeConfig;
use super::error::ProcessError;
use super::ports::{TranscodeEngine, TranscodeReport};

/// Upper bound on captured diagnostic text per stream.
const MAX_CAPTURED_BYTES: usize = 64 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// Runs an ffmpeg-compatible binary found at a configured path.
#[derive(Debug, Clone)]
pub struct FfmpegInvoker {
    binary: PathBuf,
}

impl FfmpegInvoker {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn build_args(input: &Path, output: &Path, config: &TranscodeConfig) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-y".into(), "-i".into()];
        args.push(input.as_os_str().to_owned());
        args.extend(
            [
                "-c:v",
                config.video_codec.as_str(),
                "-b:v",
                config.video_bitrate.as_str(),
                "-c:a",
                config.audio.codec_arg(),
                "-f",
                config.container.as_str(),
                // machine readable progress on stdout, errors only on stderr
                "-progress",
                "pipe:1",
                "-nostats",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }

    fn command_line(&self, args: &[OsString]) -> String {
        std::iter::once(self.binary.as_os_str())
            .chain(args.iter().map(OsString::as_os_str))
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegInvoker {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        config: &TranscodeConfig,
    ) -> Result<TranscodeReport, ProcessError> {
        let started = Instant::now();
        let args = Self::build_args(input, output, config);
        info!("🎥 Starting transcoder: {}", self.command_line(&args));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (stdout, stderr, status) = tokio::join!(
            capture(stdout, OutputStream::Stdout),
            capture(stderr, OutputStream::Stderr),
            child.wait()
        );
        let (stdout, stderr, status) = (stdout?, stderr?, status?);

        if !status.success() {
            return Err(ProcessError::Exit {
                status: status.to_string(),
                stdout,
                stderr,
            });
        }

        if tokio::fs::metadata(output).await.is_err() {
            return Err(ProcessError::MissingOutput {
                path: output.to_path_buf(),
            });
        }

        let elapsed = started.elapsed();
        info!("Done transcoding {} in {:.1}s", input.display(), elapsed.as_secs_f64());
        Ok(TranscodeReport { elapsed })
    }
}

/// Drains one child stream, logging each line and keeping a bounded tail for diagnostics.
async fn capture<R>(reader: Option<R>, stream: OutputStream) -> Result<String, ProcessError>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(String::new());
    };

    let mut reader = BufReader::new(reader);
    let mut tail: VecDeque<String> = VecDeque::new();
    let mut tail_bytes = 0usize;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf).trim_end().to_string();
        match stream {
            OutputStream::Stdout => {
                if let Some(position) = line.strip_prefix("out_time=") {
                    debug!(position, "transcode progress");
                } else if line == "progress=end" {
                    debug!("transcode progress complete");
                }
            }
            OutputStream::Stderr => debug!(target: "ffmpeg", "{}", line),
        }

        tail_bytes += line.len() + 1;
        tail.push_back(line);
        while tail_bytes > MAX_CAPTURED_BYTES {
            match tail.pop_front() {
                Some(dropped) => tail_bytes -= dropped.len() + 1,
                None => break,
            }
        }
    }

    Ok(tail.into_iter().collect::<Vec<_>>().join("\n"))
}
