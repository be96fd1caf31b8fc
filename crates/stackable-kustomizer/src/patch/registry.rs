use std::collections::BTreeSet;

use k8s_openapi::{
    Resource,
    api::{
        admissionregistration::v1::{
            MutatingWebhookConfiguration, ValidatingAdmissionPolicy,
            ValidatingAdmissionPolicyBinding, ValidatingWebhookConfiguration,
        },
        apps::v1::{ControllerRevision, DaemonSet, Deployment, ReplicaSet, StatefulSet},
        authentication::v1::{SelfSubjectReview, TokenReview},
        authorization::v1::{
            LocalSubjectAccessReview, SelfSubjectAccessReview, SelfSubjectRulesReview,
            SubjectAccessReview,
        },
        autoscaling,
        batch::v1::{CronJob, Job},
        certificates::v1::CertificateSigningRequest,
        coordination::v1::Lease,
        core::v1::{
            Binding, ComponentStatus, ConfigMap, Endpoints, Event, LimitRange, Namespace, Node,
            PersistentVolume, PersistentVolumeClaim, Pod, PodTemplate, ReplicationController,
            ResourceQuota, Secret, Service, ServiceAccount,
        },
        discovery::v1::EndpointSlice,
        events,
        flowcontrol::v1::{FlowSchema, PriorityLevelConfiguration},
        networking::v1::{Ingress, IngressClass, IPAddress, NetworkPolicy, ServiceCIDR},
        node::v1::RuntimeClass,
        policy::v1::{Eviction, PodDisruptionBudget},
        rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
        resource::v1::{DeviceClass, ResourceClaim, ResourceClaimTemplate, ResourceSlice},
        scheduling::v1::PriorityClass,
        storage::v1::{
            CSIDriver, CSINode, CSIStorageCapacity, StorageClass, VolumeAttachment,
            VolumeAttributesClass,
        },
    },
    apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
};

/// Fields whose list elements are the containers of a pod spec.
const CONTAINER_FIELDS: &[&str] = &["containers", "initContainers", "ephemeralContainers"];

/// How the elements of a list field are combined by a strategic merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListStrategy {
    /// The list is replaced as a whole.
    Replace,

    /// Elements are maps identified by the given key.
    MergeByKey(&'static str),

    /// Elements are scalars, the list is treated as a set.
    MergePrimitives,
}

/// The set of object types a strategic merge patch can be computed for.
///
/// The default registry contains the built-in Kubernetes types shipped with [`k8s_openapi`].
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    types: BTreeSet<(String, String)>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();

        // core/v1
        registry
            .register::<Binding>()
            .register::<ComponentStatus>()
            .register::<ConfigMap>()
            .register::<Endpoints>()
            .register::<Event>()
            .register::<LimitRange>()
            .register::<Namespace>()
            .register::<Node>()
            .register::<PersistentVolume>()
            .register::<PersistentVolumeClaim>()
            .register::<Pod>()
            .register::<PodTemplate>()
            .register::<ReplicationController>()
            .register::<ResourceQuota>()
            .register::<Secret>()
            .register::<Service>()
            .register::<ServiceAccount>();

        // Named groups
        registry
            .register::<MutatingWebhookConfiguration>()
            .register::<ValidatingAdmissionPolicy>()
            .register::<ValidatingAdmissionPolicyBinding>()
            .register::<ValidatingWebhookConfiguration>()
            .register::<ControllerRevision>()
            .register::<DaemonSet>()
            .register::<Deployment>()
            .register::<ReplicaSet>()
            .register::<StatefulSet>()
            .register::<SelfSubjectReview>()
            .register::<TokenReview>()
            .register::<LocalSubjectAccessReview>()
            .register::<SelfSubjectAccessReview>()
            .register::<SelfSubjectRulesReview>()
            .register::<SubjectAccessReview>()
            .register::<autoscaling::v1::HorizontalPodAutoscaler>()
            .register::<autoscaling::v2::HorizontalPodAutoscaler>()
            .register::<CronJob>()
            .register::<Job>()
            .register::<CertificateSigningRequest>()
            .register::<Lease>()
            .register::<EndpointSlice>()
            .register::<events::v1::Event>()
            .register::<FlowSchema>()
            .register::<PriorityLevelConfiguration>()
            .register::<Ingress>()
            .register::<IngressClass>()
            .register::<IPAddress>()
            .register::<NetworkPolicy>()
            .register::<ServiceCIDR>()
            .register::<RuntimeClass>()
            .register::<Eviction>()
            .register::<PodDisruptionBudget>()
            .register::<ClusterRole>()
            .register::<ClusterRoleBinding>()
            .register::<Role>()
            .register::<RoleBinding>()
            .register::<DeviceClass>()
            .register::<ResourceClaim>()
            .register::<ResourceClaimTemplate>()
            .register::<ResourceSlice>()
            .register::<PriorityClass>()
            .register::<CSIDriver>()
            .register::<CSINode>()
            .register::<CSIStorageCapacity>()
            .register::<StorageClass>()
            .register::<VolumeAttachment>()
            .register::<VolumeAttributesClass>()
            .register::<CustomResourceDefinition>();

        registry
    }
}

impl TypeRegistry {
    pub fn empty() -> Self {
        Self {
            types: BTreeSet::new(),
        }
    }

    pub fn register<K: Resource>(&mut self) -> &mut Self {
        self.register_raw(K::API_VERSION, K::KIND)
    }

    pub fn register_raw(
        &mut self,
        api_version: impl Into<String>,
        kind: impl Into<String>,
    ) -> &mut Self {
        self.types.insert((api_version.into(), kind.into()));
        self
    }

    pub fn contains(&self, api_version: &str, kind: &str) -> bool {
        self.types
            .contains(&(api_version.to_owned(), kind.to_owned()))
    }

    /// Looks up the merge strategy of the list field at the end of `path`.
    ///
    /// `path` contains the map keys leading to the field, list positions are not part of it.
    pub fn list_strategy(&self, kind: &str, path: &[&str]) -> ListStrategy {
        let Some((field, parents)) = path.split_last() else {
            return ListStrategy::Replace;
        };
        let in_container = parents
            .iter()
            .any(|parent| CONTAINER_FIELDS.contains(parent));

        match *field {
            "containers" | "initContainers" | "ephemeralContainers" => {
                ListStrategy::MergeByKey("name")
            }
            "env" | "resizePolicy" if in_container => ListStrategy::MergeByKey("name"),
            "volumeMounts" if in_container => ListStrategy::MergeByKey("mountPath"),
            "volumeDevices" if in_container => ListStrategy::MergeByKey("devicePath"),
            "ports" if in_container => ListStrategy::MergeByKey("containerPort"),
            "ports" if kind == "Service" => ListStrategy::MergeByKey("port"),
            "volumes" | "imagePullSecrets" | "resourceClaims" | "schedulingGates" => {
                ListStrategy::MergeByKey("name")
            }
            "secrets" if kind == "ServiceAccount" => ListStrategy::MergeByKey("name"),
            "hostAliases" => ListStrategy::MergeByKey("ip"),
            "topologySpreadConstraints" => ListStrategy::MergeByKey("topologyKey"),
            "conditions" => ListStrategy::MergeByKey("type"),
            "ownerReferences" => ListStrategy::MergeByKey("uid"),
            "finalizers" => ListStrategy::MergePrimitives,
            _ => ListStrategy::Replace,
        }
    }
}
