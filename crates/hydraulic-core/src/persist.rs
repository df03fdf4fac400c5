//! Predictor artifact persistence.
//!
//! An artifact is a single binary blob:
//!
//! ```text
//! +--------+---------------+------------------+-----------------+-----------------+
//! | "HVPM" | frame version | payload length   | payload         | SHA-256         |
//! | 4 B    | u16 LE        | u64 LE           | Artifact (pb)   | of payload 32 B |
//! +--------+---------------+------------------+-----------------+-----------------+
//! ```
//!
//! The protobuf payload is a tagged record: each fitted sub-object is stored
//! as a `Component { kind, params }` holding its own parameter message, next
//! to the class index -> condition label table. Loading validates every
//! layer and reports `CorruptArtifact` instead of returning a partially
//! initialized predictor.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use hydraulic_proto as proto;
use ndarray::{Array1, Array2};
use prost::Message;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::classify::{ClassTree, Classifier, DecisionTree, Node, TreeEnsemble};
use crate::error::{Error, Result};
use crate::labels::LabelCodec;
use crate::predictor::Predictor;
use crate::reduce::{Pca, Reducer};

/// Leading bytes of every predictor artifact.
pub const MAGIC: &[u8; 4] = b"HVPM";
/// Version of the binary framing.
pub const FRAME_VERSION: u16 = 1;
/// Version of the protobuf `Artifact` record layout.
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = MAGIC.len() + 2 + 8;
const DIGEST_LEN: usize = 32;

/// Fitted sub-objects that can be stored inside an artifact.
pub trait Persist: Sized {
    /// Tag stored next to the parameters.
    const KIND: &'static str;

    /// Serialize all fitted parameters.
    fn encode_params(&self) -> Vec<u8>;

    /// Rebuild the fitted object from its parameters.
    fn decode_params(bytes: &[u8]) -> Result<Self>;
}

impl Persist for Pca {
    const KIND: &'static str = "pca";

    fn encode_params(&self) -> Vec<u8> {
        let params = proto::PcaParams {
            input_width: self.input_width() as u32,
            n_components: self.n_components() as u32,
            mean: self.mean().to_vec(),
            components: self.components().iter().copied().collect(),
            whiten: self.is_whitened(),
            explained_variance: self
                .explained_variance()
                .map(|v| v.to_vec())
                .unwrap_or_default(),
        };
        params.encode_to_vec()
    }

    fn decode_params(bytes: &[u8]) -> Result<Self> {
        let params = proto::PcaParams::decode(bytes).map_err(corrupt)?;
        let width = params.input_width as usize;
        let k = params.n_components as usize;

        if params.mean.len() != width {
            return Err(Error::CorruptArtifact(format!(
                "pca mean has {} entries, expected {}",
                params.mean.len(),
                width
            )));
        }
        let components = Array2::from_shape_vec((k, width), params.components).map_err(|e| {
            Error::CorruptArtifact(format!(
                "pca components do not match ({}, {}): {}",
                k, width, e
            ))
        })?;

        let pca = Pca::from_parameters(Array1::from(params.mean), components)?;
        if params.whiten {
            pca.with_whitening(Array1::from(params.explained_variance))
        } else {
            Ok(pca)
        }
    }
}

impl Persist for TreeEnsemble {
    const KIND: &'static str = "tree_ensemble";

    fn encode_params(&self) -> Vec<u8> {
        let trees = self
            .trees()
            .iter()
            .map(|ct| proto::Tree {
                class_index: ct.class_index as u32,
                nodes: ct.tree.nodes().iter().map(encode_node).collect(),
            })
            .collect();

        let params = proto::TreeEnsembleParams {
            n_features: self.n_features() as u32,
            base_scores: self.base_scores().to_vec(),
            trees,
        };
        params.encode_to_vec()
    }

    fn decode_params(bytes: &[u8]) -> Result<Self> {
        let params = proto::TreeEnsembleParams::decode(bytes).map_err(corrupt)?;

        let trees = params
            .trees
            .into_iter()
            .map(|t| {
                let nodes = t
                    .nodes
                    .into_iter()
                    .map(decode_node)
                    .collect::<Result<Vec<_>>>()?;
                Ok(ClassTree {
                    class_index: t.class_index as usize,
                    tree: DecisionTree::new(nodes)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        TreeEnsemble::new(params.n_features as usize, params.base_scores, trees)
    }
}

fn encode_node(node: &Node) -> proto::TreeNode {
    use proto::tree_node::Kind;

    let kind = match node {
        Node::Split {
            feature,
            threshold,
            left,
            right,
            default_left,
        } => Kind::Split(proto::Split {
            feature: *feature as u32,
            threshold: *threshold,
            left: *left as u32,
            right: *right as u32,
            default_left: *default_left,
        }),
        Node::Leaf(value) => Kind::Leaf(*value),
    };
    proto::TreeNode { kind: Some(kind) }
}

fn decode_node(node: proto::TreeNode) -> Result<Node> {
    use proto::tree_node::Kind;

    match node.kind {
        Some(Kind::Split(s)) => Ok(Node::Split {
            feature: s.feature as usize,
            threshold: s.threshold,
            left: s.left as usize,
            right: s.right as usize,
            default_left: s.default_left,
        }),
        Some(Kind::Leaf(value)) => Ok(Node::Leaf(value)),
        None => Err(Error::CorruptArtifact("tree node has no kind".to_string())),
    }
}

/// Serialize a predictor into an artifact blob.
pub fn to_bytes<C, R>(predictor: &Predictor<C, R>) -> Vec<u8>
where
    C: Classifier + Persist,
    R: Reducer + Persist,
{
    let artifact = proto::Artifact {
        format_version: FORMAT_VERSION,
        classifier: Some(component(predictor.classifier())),
        low_rate_reducer: Some(component(predictor.low_rate_reducer())),
        high_rate_reducer: Some(component(predictor.high_rate_reducer())),
        condition_labels: label_table(predictor.codec()),
    };
    frame(&artifact.encode_to_vec())
}

/// Rebuild a predictor from an artifact blob.
pub fn from_bytes<C, R>(bytes: &[u8]) -> Result<Predictor<C, R>>
where
    C: Classifier + Persist,
    R: Reducer + Persist,
{
    let result = decode_artifact(bytes);
    if let Err(e) = &result {
        warn!("Rejected predictor artifact: {}", e);
    }
    result
}

/// Write a predictor artifact to `destination`.
pub fn save<C, R, W>(predictor: &Predictor<C, R>, mut destination: W) -> Result<()>
where
    C: Classifier + Persist,
    R: Reducer + Persist,
    W: Write,
{
    let bytes = to_bytes(predictor);
    destination.write_all(&bytes)?;
    destination.flush()?;
    Ok(())
}

/// Read a predictor artifact from `source`.
pub fn load<C, R, S>(mut source: S) -> Result<Predictor<C, R>>
where
    C: Classifier + Persist,
    R: Reducer + Persist,
    S: Read,
{
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes)?;
    from_bytes(&bytes)
}

/// Save a predictor artifact to a file, replacing any existing content.
pub fn save_to_path<C, R>(predictor: &Predictor<C, R>, path: impl AsRef<Path>) -> Result<()>
where
    C: Classifier + Persist,
    R: Reducer + Persist,
{
    let path = path.as_ref();
    // Encode fully before touching the file
    let bytes = to_bytes(predictor);

    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;

    info!(
        "Saved predictor artifact to {} ({} bytes)",
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// Load a predictor artifact from a file.
pub fn load_from_path<C, R>(path: impl AsRef<Path>) -> Result<Predictor<C, R>>
where
    C: Classifier + Persist,
    R: Reducer + Persist,
{
    let path = path.as_ref();
    info!("Loading predictor artifact from {}", path.display());

    let predictor = load(File::open(path)?)?;
    info!("Predictor loaded successfully");
    Ok(predictor)
}

fn component<T: Persist>(value: &T) -> proto::Component {
    proto::Component {
        kind: T::KIND.to_string(),
        params: value.encode_params(),
    }
}

fn label_table(codec: &LabelCodec) -> Vec<u32> {
    codec.percentages().into_iter().map(u32::from).collect()
}

fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + DIGEST_LEN);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&Sha256::digest(payload));
    out
}

/// Strip and verify the framing, returning the protobuf payload.
fn unframe(bytes: &[u8]) -> Result<&[u8]> {
    if bytes.len() < HEADER_LEN + DIGEST_LEN {
        return Err(Error::CorruptArtifact(format!(
            "artifact is {} bytes, shorter than the minimum {}",
            bytes.len(),
            HEADER_LEN + DIGEST_LEN
        )));
    }

    let (header, rest) = bytes.split_at(HEADER_LEN);
    if &header[..4] != MAGIC {
        return Err(Error::CorruptArtifact(
            "not a predictor artifact (bad magic)".to_string(),
        ));
    }

    let frame_version = u16::from_le_bytes([header[4], header[5]]);
    if frame_version != FRAME_VERSION {
        return Err(Error::CorruptArtifact(format!(
            "unsupported frame version {}",
            frame_version
        )));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&header[6..14]);
    let declared = u64::from_le_bytes(len_bytes);
    let actual = (rest.len() - DIGEST_LEN) as u64;
    if declared != actual {
        return Err(Error::CorruptArtifact(format!(
            "payload length is {} bytes, header declares {}",
            actual, declared
        )));
    }

    let (payload, digest) = rest.split_at(rest.len() - DIGEST_LEN);
    if Sha256::digest(payload).as_slice() != digest {
        return Err(Error::CorruptArtifact("checksum mismatch".to_string()));
    }

    Ok(payload)
}

fn decode_artifact<C, R>(bytes: &[u8]) -> Result<Predictor<C, R>>
where
    C: Classifier + Persist,
    R: Reducer + Persist,
{
    let payload = unframe(bytes)?;
    let artifact = proto::Artifact::decode(payload).map_err(corrupt)?;

    if artifact.format_version != FORMAT_VERSION {
        return Err(Error::CorruptArtifact(format!(
            "unsupported format version {}",
            artifact.format_version
        )));
    }

    if artifact.condition_labels != label_table(&LabelCodec::standard()) {
        return Err(Error::CorruptArtifact(format!(
            "condition label table {:?} is missing or altered",
            artifact.condition_labels
        )));
    }

    let classifier = restore::<C>(artifact.classifier, "classifier")?;
    let low_rate = restore::<R>(artifact.low_rate_reducer, "low-rate reducer")?;
    let high_rate = restore::<R>(artifact.high_rate_reducer, "high-rate reducer")?;

    Predictor::new(classifier, low_rate, high_rate)
        .map_err(|e| Error::CorruptArtifact(format!("inconsistent pipeline: {}", e)))
}

fn restore<T: Persist>(component: Option<proto::Component>, role: &str) -> Result<T> {
    let component =
        component.ok_or_else(|| Error::CorruptArtifact(format!("{} is missing", role)))?;

    if component.kind != T::KIND {
        return Err(Error::CorruptArtifact(format!(
            "{} has kind '{}', expected '{}'",
            role,
            component.kind,
            T::KIND
        )));
    }

    T::decode_params(&component.params).map_err(|e| match e {
        Error::CorruptArtifact(msg) => Error::CorruptArtifact(format!("{}: {}", role, msg)),
        other => Error::CorruptArtifact(format!("{}: {}", role, other)),
    })
}

fn corrupt(e: prost::DecodeError) -> Error {
    Error::CorruptArtifact(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_predictor() -> Predictor {
        let low = Pca::from_parameters(array![0.5, 0.5], array![[1.0, -1.0]]).unwrap();
        let high = Pca::from_parameters(array![0.0, 0.0, 0.0], array![[0.0, 1.0, 0.0]])
            .unwrap()
            .with_whitening(array![4.0])
            .unwrap();
        let tree = DecisionTree::new(vec![
            Node::Split {
                feature: 1,
                threshold: 0.25,
                left: 1,
                right: 2,
                default_left: false,
            },
            Node::Leaf(-1.5),
            Node::Leaf(1.5),
        ])
        .unwrap();
        let classifier = TreeEnsemble::new(
            2,
            vec![0.0, 0.0, 0.0, 0.1],
            vec![ClassTree {
                class_index: 3,
                tree,
            }],
        )
        .unwrap();
        Predictor::new(classifier, low, high).unwrap()
    }

    fn artifact_of(predictor: &Predictor) -> proto::Artifact {
        let bytes = to_bytes(predictor);
        proto::Artifact::decode(unframe(&bytes).unwrap()).unwrap()
    }

    fn expect_corrupt(bytes: &[u8]) -> String {
        match from_bytes::<TreeEnsemble, Pca>(bytes) {
            Err(Error::CorruptArtifact(msg)) => msg,
            Err(other) => panic!("expected CorruptArtifact, got {:?}", other),
            Ok(_) => panic!("expected CorruptArtifact, got a predictor"),
        }
    }

    #[test]
    fn test_roundtrip_preserves_parameters() {
        let predictor = small_predictor();
        let restored: Predictor = from_bytes(&to_bytes(&predictor)).unwrap();
        assert_eq!(restored.classifier(), predictor.classifier());
        assert_eq!(restored.low_rate_reducer(), predictor.low_rate_reducer());
        assert_eq!(restored.high_rate_reducer(), predictor.high_rate_reducer());
        assert_eq!(restored.codec(), predictor.codec());
    }

    #[test]
    fn test_frame_layout() {
        let bytes = to_bytes(&small_predictor());
        assert_eq!(&bytes[..4], b"HVPM");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), FRAME_VERSION);
    }

    #[test]
    fn test_altered_label_table() {
        let mut artifact = artifact_of(&small_predictor());
        artifact.condition_labels = vec![73, 80, 90, 95];
        let msg = expect_corrupt(&frame(&artifact.encode_to_vec()));
        assert!(msg.contains("label table"), "{}", msg);

        artifact.condition_labels.clear();
        expect_corrupt(&frame(&artifact.encode_to_vec()));
    }

    #[test]
    fn test_missing_components() {
        let mut artifact = artifact_of(&small_predictor());
        artifact.classifier = None;
        let msg = expect_corrupt(&frame(&artifact.encode_to_vec()));
        assert!(msg.contains("classifier is missing"), "{}", msg);

        let mut artifact = artifact_of(&small_predictor());
        artifact.high_rate_reducer = None;
        let msg = expect_corrupt(&frame(&artifact.encode_to_vec()));
        assert!(msg.contains("high-rate reducer is missing"), "{}", msg);
    }

    #[test]
    fn test_wrong_component_kind() {
        let mut artifact = artifact_of(&small_predictor());
        artifact.low_rate_reducer = artifact.classifier.clone();
        let msg = expect_corrupt(&frame(&artifact.encode_to_vec()));
        assert!(msg.contains("low-rate reducer has kind"), "{}", msg);
    }

    #[test]
    fn test_invalid_component_params() {
        let mut artifact = artifact_of(&small_predictor());
        if let Some(c) = artifact.low_rate_reducer.as_mut() {
            c.params = vec![0xff, 0xff, 0xff];
        }
        expect_corrupt(&frame(&artifact.encode_to_vec()));
    }

    #[test]
    fn test_reducer_classifier_misalignment() {
        let mut artifact = artifact_of(&small_predictor());
        let wide = Pca::from_parameters(array![0.0, 0.0], array![[1.0, 0.0], [0.0, 1.0]]).unwrap();
        artifact.low_rate_reducer = Some(component(&wide));
        let msg = expect_corrupt(&frame(&artifact.encode_to_vec()));
        assert!(msg.contains("inconsistent pipeline"), "{}", msg);
    }

    #[test]
    fn test_future_format_version() {
        let mut artifact = artifact_of(&small_predictor());
        artifact.format_version = FORMAT_VERSION + 1;
        let msg = expect_corrupt(&frame(&artifact.encode_to_vec()));
        assert!(msg.contains("format version"), "{}", msg);
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = to_bytes(&small_predictor());
        bytes[HEADER_LEN + 1] ^= 0x01;
        let msg = expect_corrupt(&bytes);
        assert!(msg.contains("checksum"), "{}", msg);
    }

    #[test]
    fn test_truncated_and_garbage() {
        let bytes = to_bytes(&small_predictor());
        for len in [0, 3, HEADER_LEN, bytes.len() / 2, bytes.len() - 1] {
            expect_corrupt(&bytes[..len]);
        }
        expect_corrupt(b"definitely not a model artifact, just some text");

        let mut foreign = bytes.clone();
        foreign[..4].copy_from_slice(b"PK\x03\x04");
        let msg = expect_corrupt(&foreign);
        assert!(msg.contains("magic"), "{}", msg);
    }
}
