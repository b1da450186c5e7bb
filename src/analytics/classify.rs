/// Marker that introduces a FHIR resource type in a request path.
const FHIR_MARKER: &str = "/fhir/";

/// CRUD shape of a request against a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOp {
    Read,
    Create,
    Update,
    Delete,
    Search,
}

/// Resource type named by the segment right after `/fhir/`.
///
/// `"/fhir/Patient/123"` → `"Patient"`, `"/api/v1/users"` → `""`.
pub fn extract_resource_type(path: &str) -> String {
    let Some(idx) = path.find(FHIR_MARKER) else {
        return String::new();
    };

    let rest = &path[idx + FHIR_MARKER.len()..];
    match rest.find('/') {
        Some(end) => rest[..end].to_owned(),
        None => rest.to_owned(),
    }
}

/// True when something follows the resource type as a further path
/// segment, which is taken to be an id.
///
/// Plain substring match on the first occurrence of `resource_type`,
/// so a path that repeats the type name earlier can be misread.
pub fn is_read_by_id(path: &str, resource_type: &str) -> bool {
    if resource_type.is_empty() {
        return false;
    }
    let Some(idx) = path.find(resource_type) else {
        return false;
    };

    let rest = &path[idx + resource_type.len()..];
    rest.len() > 1 && rest.starts_with('/')
}

/// Maps an HTTP method onto the resource counter it bumps.
/// Methods outside GET/POST/PUT/PATCH/DELETE don't count.
pub fn classify(
    method: &str,
    path: &str,
    resource_type: &str,
) -> Option<ResourceOp> {
    match method {
        "POST" => Some(ResourceOp::Create),
        "PUT" | "PATCH" => Some(ResourceOp::Update),
        "DELETE" => Some(ResourceOp::Delete),
        "GET" if is_read_by_id(path, resource_type) => Some(ResourceOp::Read),
        "GET" => Some(ResourceOp::Search),
        _ => None,
    }
}
