use crate::{
    config::SecurityContextMode,
    consts::{NON_ROOT_USER_ID, TMP_MOUNT_PATH, TMP_VOLUME_NAME},
    types::FunctionDeployment,
};
use k8s_openapi::api::core::v1::{Container, PodSpec, SecurityContext, Volume, VolumeMount};

/// Applies the container security context for a function.
///
/// Implementations overwrite the fields they own on every reconcile. Whatever
/// a previous reconcile or another writer set for those fields is discarded.
pub trait SecurityContextConfigurator: Send + Sync {
    fn configure_security_context(&self, request: &FunctionDeployment, pod_spec: &mut PodSpec);
}

pub fn security_context_configurator(
    mode: SecurityContextMode,
) -> Box<dyn SecurityContextConfigurator> {
    match mode {
        SecurityContextMode::RootFilesystem => Box::new(RootFilesystemOnly),
        SecurityContextMode::NonRoot => Box::new(NonRootUser {
            user_id: NON_ROOT_USER_ID,
        }),
    }
}

/// Manages the read-only root filesystem flag and clears any run-as-user.
pub struct RootFilesystemOnly;

impl SecurityContextConfigurator for RootFilesystemOnly {
    fn configure_security_context(&self, request: &FunctionDeployment, pod_spec: &mut PodSpec) {
        configure_read_only_root_filesystem(request, pod_spec);
        set_run_as_user(pod_spec, None);
    }
}

/// Manages the read-only root filesystem flag and runs containers as `user_id`.
pub struct NonRootUser {
    pub user_id: i64,
}

impl SecurityContextConfigurator for NonRootUser {
    fn configure_security_context(&self, request: &FunctionDeployment, pod_spec: &mut PodSpec) {
        configure_read_only_root_filesystem(request, pod_spec);
        set_run_as_user(pod_spec, Some(self.user_id));
    }
}

fn security_context(container: &mut Container) -> &mut SecurityContext {
    container
        .security_context
        .get_or_insert_with(SecurityContext::default)
}

fn set_run_as_user(pod_spec: &mut PodSpec, user_id: Option<i64>) {
    for container in pod_spec.containers.iter_mut() {
        security_context(container).run_as_user = user_id;
    }
}

/// A read-only root filesystem comes with a writable `/tmp` emptyDir.
fn configure_read_only_root_filesystem(request: &FunctionDeployment, pod_spec: &mut PodSpec) {
    let read_only = request.read_only_root_filesystem;

    let volumes = pod_spec.volumes.get_or_insert_with(Vec::new);
    volumes.retain(|volume| volume.name != TMP_VOLUME_NAME);
    if read_only {
        volumes.push(Volume {
            name: String::from(TMP_VOLUME_NAME),
            empty_dir: Some(Default::default()),
            ..Default::default()
        });
    }
    if volumes.is_empty() {
        pod_spec.volumes = None;
    }

    for container in pod_spec.containers.iter_mut() {
        security_context(container).read_only_root_filesystem = Some(read_only);

        let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
        mounts.retain(|mount| mount.name != TMP_VOLUME_NAME);
        if read_only {
            mounts.push(VolumeMount {
                name: String::from(TMP_VOLUME_NAME),
                mount_path: String::from(TMP_MOUNT_PATH),
                ..Default::default()
            });
        }
        if mounts.is_empty() {
            container.volume_mounts = None;
        }
    }
}
