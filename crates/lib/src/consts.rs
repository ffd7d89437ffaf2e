//! Shared constants.

/// Name used for the work, fixture and log directories.
pub const APP_NAME: &str = "brats";

/// Suffix appended to a buildpack name when it is registered with the platform.
pub const BUILDPACK_SUFFIX: &str = "brat-buildpack";

/// Name of the template application directory inside each runtime's fixture tree.
pub const DEFAULT_TEMPLATE: &str = "simple_brats";

/// Line printed by the `.profile` script added to fixtures.
pub const PROFILE_SCRIPT_MARKER: &str = "PROFILE_SCRIPT_IS_PRESENT_AND_RAN";

/// Staging output of a buildpack that notices it was updated since the last push.
pub const BUMP_WARNING: &str = "WARNING: buildpack version changed from";

/// Credentials injected into dependency URIs by `package_with_uri_credentials`.
pub const URI_CREDENTIAL_USER: &str = "login";
pub const URI_CREDENTIAL_PASSWORD: &str = "password";

/// Credentials stored in the user-provided service bound to "service" deployments.
pub const SERVICE_USERNAME: &str = "brats-service-user";
pub const SERVICE_PASSWORD: &str = "brats-service-s3cr3t";

/// Length of the hex digest used for lock file names.
pub const LOCK_HASH_LEN: usize = 16;
