//! Pinning
//!
//! Keep what we gather. Pins tell the daemon which DAGs survive garbage
//! collection; this module adds, lists, removes, moves and verifies them.
//!
//! Everything except `verify` is one request, one answer. `verify` streams:
//! a background task decodes the daemon's status records, one JSON value at
//! a time, and hands them over through a single-slot channel.

use crate::client::IpfsClient;
use crate::options::{PinAddOptions, PinLsOptions, PinUpdateOptions};
use crate::path::{ContentPath, ResolvedPath};
use crate::transport::Response;
use crate::{parse_cid, Error, Result};
use futures::Stream;
use serde::Deserialize;
use std::collections::HashMap;
use std::task::{Context, Poll};
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// A pinned node as reported by `pin/ls`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    path: ResolvedPath,
    pin_type: String,
}

impl Pin {
    pub fn path(&self) -> &ResolvedPath {
        &self.path
    }

    /// "recursive", "direct" or "indirect"
    pub fn pin_type(&self) -> &str {
        &self.pin_type
    }
}

/// One record of a `pin/verify` run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PinStatus {
    #[serde(rename = "Cid", default)]
    cid: String,
    #[serde(rename = "Ok", default)]
    ok: bool,
    #[serde(rename = "BadNodes", default)]
    bad_nodes: Option<Vec<BadPinNode>>,
}

impl PinStatus {
    /// The pinned root this record is about
    pub fn cid(&self) -> &str {
        &self.cid
    }

    pub fn ok(&self) -> bool {
        self.ok
    }

    pub fn bad_nodes(&self) -> &[BadPinNode] {
        self.bad_nodes.as_deref().unwrap_or(&[])
    }
}

/// A node under a pin that failed verification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BadPinNode {
    #[serde(rename = "Cid", default)]
    cid: String,
    #[serde(rename = "Err", default)]
    err: Option<String>,
}

impl BadPinNode {
    pub fn cid(&self) -> &str {
        &self.cid
    }

    /// `None` when the daemon sent something that isn't a CID
    pub fn path(&self) -> Option<ResolvedPath> {
        ResolvedPath::from_cid_str(&self.cid).ok()
    }

    /// The daemon's message if it gave one, else the CID parse failure if any.
    ///
    /// A node with an empty message and a valid CID yields `None` even though
    /// it was listed as bad.
    pub fn err(&self) -> Option<Error> {
        if let Some(message) = self.err.as_deref().filter(|m| !m.is_empty()) {
            return Some(Error::Remote(message.to_string()));
        }
        parse_cid(&self.cid).err()
    }
}

#[derive(Debug, Deserialize)]
struct PinRefKeyList {
    #[serde(rename = "Keys", default)]
    keys: Option<HashMap<String, PinRefKeyObject>>,
}

#[derive(Debug, Deserialize)]
struct PinRefKeyObject {
    #[serde(rename = "Type", default)]
    pin_type: String,
}

/// Pin operations, borrowed from an [`IpfsClient`]
pub struct PinApi<'a> {
    client: &'a IpfsClient,
}

impl<'a> PinApi<'a> {
    pub(crate) fn new(client: &'a IpfsClient) -> Self {
        Self { client }
    }

    /// Pin `path` (recursively unless told otherwise)
    pub async fn add(&self, path: &ContentPath, options: PinAddOptions) -> Result<()> {
        self.client
            .request("pin/add")
            .argument(path)
            .option("recursive", options.is_recursive())
            .exec_empty()
            .await
    }

    /// List pins matching the type filter. Order is whatever the map gave us.
    pub async fn ls(&self, options: PinLsOptions) -> Result<Vec<Pin>> {
        let filter = options.resolve()?;

        let out: PinRefKeyList = self
            .client
            .request("pin/ls")
            .option("type", filter)
            .exec()
            .await?;

        let keys = out.keys.unwrap_or_default();
        let mut pins = Vec::with_capacity(keys.len());
        for (hash, entry) in keys {
            pins.push(Pin {
                path: ResolvedPath::new(parse_cid(&hash)?),
                pin_type: entry.pin_type,
            });
        }

        tracing::debug!("pin/ls ({}) returned {} pins", filter, pins.len());
        Ok(pins)
    }

    /// Unpin `path`
    pub async fn rm(&self, path: &ContentPath) -> Result<()> {
        self.client
            .request("pin/rm")
            .argument(path)
            .exec_empty()
            .await
    }

    /// Move a pin from `from` to `to`
    pub async fn update(
        &self,
        from: &ContentPath,
        to: &ContentPath,
        options: PinUpdateOptions,
    ) -> Result<()> {
        self.client
            .request("pin/update")
            .argument(from)
            .argument(to)
            .option("unpin", options.is_unpin())
            .exec_empty()
            .await
    }

    /// Verify every pin. Returns once the daemon accepts the request; records
    /// then arrive on the stream until it is exhausted or `cancel` fires.
    pub async fn verify(&self, cancel: CancellationToken) -> Result<VerifyStream> {
        let response = self
            .client
            .request("pin/verify")
            .option("verbose", true)
            .send()
            .await?;

        let (records_tx, records) = mpsc::channel(1);
        let (outcome_tx, outcome) = oneshot::channel();
        tokio::spawn(decode_verify_stream(response, records_tx, cancel, outcome_tx));

        Ok(VerifyStream { records, outcome })
    }
}

/// How a verify stream ended
#[derive(Debug)]
pub enum VerifyOutcome {
    /// The daemon finished sending
    Exhausted,
    /// The cancellation token fired
    Cancelled,
    /// The consumer went away first
    Abandoned,
    /// Reading or decoding the body failed; records after the failure are lost
    Failed(Error),
}

impl VerifyOutcome {
    pub fn into_result(self) -> Result<()> {
        match self {
            VerifyOutcome::Failed(e) => Err(e),
            _ => Ok(()),
        }
    }
}

/// Lazily produced `pin/verify` records. Not restartable.
#[derive(Debug)]
pub struct VerifyStream {
    records: mpsc::Receiver<PinStatus>,
    outcome: oneshot::Receiver<VerifyOutcome>,
}

impl VerifyStream {
    /// Next record, `None` once the producer is done
    pub async fn next(&mut self) -> Option<PinStatus> {
        self.records.recv().await
    }

    /// Stop consuming and report why the stream ended.
    ///
    /// A decode failure ends the stream just like a clean end of body does;
    /// this is the only place the difference shows.
    pub async fn finish(self) -> VerifyOutcome {
        let VerifyStream { records, outcome } = self;
        drop(records);
        outcome.await.unwrap_or(VerifyOutcome::Abandoned)
    }
}

impl Stream for VerifyStream {
    type Item = PinStatus;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<PinStatus>> {
        self.records.poll_recv(cx)
    }
}

/// Bytes read so far from a verify body, drained one JSON value at a time.
///
/// Values may sit back to back on one line or spread over several.
#[derive(Default)]
struct RecordBuffer {
    buf: Vec<u8>,
}

impl RecordBuffer {
    /// Next complete record, or `None` if more bytes are needed
    fn next_record(&mut self) -> std::result::Result<Option<PinStatus>, serde_json::Error> {
        let (next, used) = {
            let mut values =
                serde_json::Deserializer::from_slice(&self.buf).into_iter::<PinStatus>();
            let next = values.next();
            (next, values.byte_offset())
        };
        match next {
            Some(Ok(status)) => {
                self.buf.drain(..used);
                Ok(Some(status))
            }
            // Partial value at the tail
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(e)) => Err(e),
            None => {
                self.buf.clear();
                Ok(None)
            }
        }
    }

    /// Body ended: anything but whitespace left over is a truncated record
    fn finish(&self) -> VerifyOutcome {
        if self.buf.iter().all(u8::is_ascii_whitespace) {
            VerifyOutcome::Exhausted
        } else {
            tracing::warn!("pin/verify: body ended inside a record");
            VerifyOutcome::Failed(Error::Decode(
                "pin/verify: body ended inside a record".into(),
            ))
        }
    }
}

async fn decode_verify_stream(
    response: Response,
    records: mpsc::Sender<PinStatus>,
    cancel: CancellationToken,
    outcome_tx: oneshot::Sender<VerifyOutcome>,
) {
    let mut body = response.output;
    let mut pending = RecordBuffer::default();
    let mut delivered = 0usize;

    let outcome = loop {
        let status = match pending.next_record() {
            Ok(Some(status)) => status,
            Ok(None) => {
                let read = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break VerifyOutcome::Cancelled,
                    _ = records.closed() => break VerifyOutcome::Abandoned,
                    read = body.read_buf(&mut pending.buf) => read,
                };
                match read {
                    Ok(0) => break pending.finish(),
                    Ok(_) => continue,
                    Err(e) => break VerifyOutcome::Failed(Error::Io(e)),
                }
            }
            Err(e) => {
                tracing::warn!(
                    "pin/verify: undecodable record after {} good ones: {}",
                    delivered,
                    e
                );
                break VerifyOutcome::Failed(Error::Decode(format!("pin/verify: {}", e)));
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break VerifyOutcome::Cancelled,
            sent = records.send(status) => {
                if sent.is_err() {
                    break VerifyOutcome::Abandoned;
                }
                delivered += 1;
            }
        }
    };

    // Body goes before the channel closes, so end-of-stream implies released
    drop(body);
    drop(records);

    tracing::debug!("pin/verify finished after {} records: {:?}", delivered, outcome);
    let _ = outcome_tx.send(outcome);
}
