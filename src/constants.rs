// -
// Coordinate conventions

/// Separator joining the four components of a watch key
pub const CLUSTER_NAMESPACE_SEPARATOR: &str = "+";

/// Cluster every app implicitly owns and watches
pub const CLUSTER_NAME_DEFAULT: &str = "default";

/// Bootstrap namespace every app has; never inherits from public namespaces
pub const NAMESPACE_APPLICATION: &str = "application";

/// Reserved app id used by anonymous, unscoped reads
pub const NO_APPID_PLACEHOLDER: &str = "ApolloNoAppIdPlaceHolder";

/// Notification id of a key that has never seen a release message
pub const NOTIFICATION_ID_PLACEHOLDER: i64 = -1;

/// Channel release messages are published on
pub const RELEASE_MESSAGE_TOPIC: &str = "apollo-release";

/// Namespace format suffix clients may append and the server ignores
pub(crate) const PROPERTIES_SUFFIX: &str = ".properties";

/// Joins component release keys of a merged (app + public) config
pub(crate) const RELEASE_KEY_SEPARATOR: &str = "+";
