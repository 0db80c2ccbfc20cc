//! Android backend bridging a host-side `LocationBridge` object via JNI.
//!
//! The Java/Kotlin side owns the fused location client, the permission
//! prompts and every dialog; this backend forwards controller commands to
//! it and receives events back as tagged JSON through the exported
//! `dispatchEvent` entry point.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use geokit_permission::Permission;
use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::{jint, jlong};
use jni::{JNIEnv, JavaVM};
use log::{error, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::{ClientDelegate, LocationBackend, RecoveryChoice};
use crate::config::UpdateRequest;
use crate::error::{LocationError, LocationResult};
use crate::event::{ClientEvent, ProviderAvailability};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);
static DELEGATES: OnceLock<Mutex<HashMap<u64, Arc<dyn ClientDelegate>>>> = OnceLock::new();

fn delegates() -> &'static Mutex<HashMap<u64, Arc<dyn ClientDelegate>>> {
    DELEGATES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Permission constants shared with the Java/Kotlin bridge.
const PERMISSION_FINE_LOCATION: jint = 0;
const PERMISSION_COARSE_LOCATION: jint = 1;

/// Recovery choice constants shared with the Java/Kotlin bridge.
const RECOVERY_APP_SETTINGS: jint = 0;
const RECOVERY_LOCATION_SETTINGS: jint = 1;

const fn permission_to_jint(permission: Permission) -> jint {
    // Permission is non_exhaustive; anything unknown degrades to coarse.
    match permission {
        Permission::FineLocation => PERMISSION_FINE_LOCATION,
        _ => PERMISSION_COARSE_LOCATION,
    }
}

const fn recovery_to_jint(choice: RecoveryChoice) -> jint {
    match choice {
        RecoveryChoice::AppSettings => RECOVERY_APP_SETTINGS,
        RecoveryChoice::LocationSettings => RECOVERY_LOCATION_SETTINGS,
    }
}

/// Backend implementation backed by an Android Java/Kotlin bridge via JNI.
pub struct AndroidLocationBackend {
    vm: JavaVM,
    bridge: GlobalRef,
    handle: u64,
    delegate: Mutex<Option<Arc<dyn ClientDelegate>>>,
}

impl fmt::Debug for AndroidLocationBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidLocationBackend")
            .field("handle", &self.handle)
            .finish()
    }
}

impl AndroidLocationBackend {
    /// Create a new backend from an Android `LocationBridge` object.
    ///
    /// # Errors
    /// Returns an error if the JVM handle or the global reference cannot be
    /// obtained.
    pub fn new(env: &JNIEnv<'_>, bridge: JObject<'_>) -> LocationResult<Self> {
        let vm = env.get_java_vm().map_err(map_jni_error)?;
        let global = env.new_global_ref(bridge).map_err(map_jni_error)?;
        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);

        Ok(Self {
            vm,
            bridge: global,
            handle,
            delegate: Mutex::new(None),
        })
    }

    /// Native handle associated with this backend instance for callbacks
    /// from Java/Kotlin.
    #[must_use]
    pub const fn handle(&self) -> u64 {
        self.handle
    }

    fn with_attached_env<F>(&self, action: F) -> LocationResult<()>
    where
        F: FnOnce(&mut JNIEnv<'_>, &JObject<'_>) -> jni::errors::Result<()>,
    {
        let mut env = self.vm.attach_current_thread().map_err(map_jni_error)?;
        action(&mut env, self.bridge.as_obj()).map_err(map_jni_error)
    }

    fn with_bridge<F>(&self, action: F) -> LocationResult<()>
    where
        F: FnOnce(&mut JNIEnv<'_>, &JObject<'_>) -> jni::errors::Result<()>,
    {
        if self
            .delegate
            .lock()
            .expect("delegate mutex poisoned")
            .is_none()
        {
            return Err(LocationError::Platform {
                message: "no client delegate registered".to_owned(),
            });
        }

        self.with_attached_env(action)
    }

    fn register_handle(&self) -> LocationResult<()> {
        self.with_attached_env(|env, bridge| {
            let args = [JValue::Long(self.handle as jlong)];
            env.call_method(bridge, "registerNativeHandle", "(J)V", &args)?;
            Ok(())
        })
    }

    fn query_providers(&self) -> LocationResult<ProviderAvailability> {
        let mut env = self.vm.attach_current_thread().map_err(map_jni_error)?;
        let value = env
            .call_method(self.bridge.as_obj(), "queryProviders", "()Ljava/lang/String;", &[])
            .map_err(map_jni_error)?
            .l()
            .map_err(map_jni_error)?;
        let json = env
            .get_string(&JString::from(value))
            .map_err(map_jni_error)?
            .to_string_lossy()
            .into_owned();
        from_json(&json)
    }
}

impl LocationBackend for AndroidLocationBackend {
    fn set_delegate(&self, delegate: Arc<dyn ClientDelegate>) {
        {
            let mut guard = self.delegate.lock().expect("delegate mutex poisoned");
            guard.clone_from(&Some(delegate.clone()));
        }

        {
            let mut map = delegates().lock().expect("delegate map mutex poisoned");
            map.insert(self.handle, delegate);
        }

        if let Err(err) = self.register_handle() {
            error!("failed to register Android location handle: {err}");
        }
    }

    fn connect(&self) -> LocationResult<()> {
        self.with_bridge(|env, bridge| {
            env.call_method(bridge, "connect", "()V", &[])?;
            Ok(())
        })
    }

    fn disconnect(&self) {
        if let Err(err) = self.with_attached_env(|env, bridge| {
            env.call_method(bridge, "disconnect", "()V", &[])?;
            Ok(())
        }) {
            error!("failed to disconnect Android location client: {err}");
        }
    }

    fn request_updates(&self, request: &UpdateRequest) -> LocationResult<()> {
        let json = to_json(request)?;
        self.with_bridge(|env, bridge| {
            let j_string = env.new_string(json.as_str())?;
            let j_object = JObject::from(j_string);
            let args = [JValue::Object(&j_object)];
            env.call_method(bridge, "requestUpdates", "(Ljava/lang/String;)V", &args)?;
            Ok(())
        })
    }

    fn remove_updates(&self) {
        if let Err(err) = self.with_attached_env(|env, bridge| {
            env.call_method(bridge, "removeUpdates", "()V", &[])?;
            Ok(())
        }) {
            error!("failed to remove Android location updates: {err}");
        }
    }

    fn provider_availability(&self) -> ProviderAvailability {
        match self.query_providers() {
            Ok(providers) => providers,
            Err(err) => {
                // Conservative fallback: a failed query counts as disabled.
                warn!("Android provider query failed, treating providers as disabled: {err}");
                ProviderAvailability::default()
            }
        }
    }

    fn request_permission(&self, permission: Permission, request_code: i32) -> LocationResult<()> {
        self.with_bridge(|env, bridge| {
            let args = [
                JValue::Int(permission_to_jint(permission)),
                JValue::Int(request_code),
            ];
            env.call_method(bridge, "requestPermission", "(II)V", &args)?;
            Ok(())
        })
    }

    fn begin_resolution(&self, request_code: i32) -> LocationResult<()> {
        self.with_bridge(|env, bridge| {
            let args = [JValue::Int(request_code)];
            env.call_method(bridge, "beginResolution", "(I)V", &args)?;
            Ok(())
        })
    }

    fn present_recovery(&self, choice: RecoveryChoice, request_code: i32) {
        if let Err(err) = self.with_attached_env(|env, bridge| {
            let args = [JValue::Int(recovery_to_jint(choice)), JValue::Int(request_code)];
            env.call_method(bridge, "presentRecovery", "(II)V", &args)?;
            Ok(())
        }) {
            error!("failed to present Android recovery choice: {err}");
        }
    }

    fn notify_failure(&self, error: &LocationError) {
        let message = error.to_string();
        if let Err(err) = self.with_attached_env(|env, bridge| {
            let j_string = env.new_string(message.as_str())?;
            let j_object = JObject::from(j_string);
            let args = [JValue::Object(&j_object)];
            env.call_method(bridge, "notifyFailure", "(Ljava/lang/String;)V", &args)?;
            Ok(())
        }) {
            error!("failed to surface Android location failure: {err}");
        }
    }
}

impl Drop for AndroidLocationBackend {
    fn drop(&mut self) {
        if let Some(map) = DELEGATES.get() {
            let mut guard = map.lock().expect("delegate map mutex poisoned");
            guard.remove(&self.handle);
        }
    }
}

#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_geokit_location_LocationBridge_dispatchEvent(
    mut env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jlong,
    json_event: JString<'_>,
) {
    #[allow(clippy::cast_sign_loss)]
    let handle = handle as u64;
    let json = match env.get_string(&json_event) {
        Ok(value) => value.to_string_lossy().into_owned(),
        Err(err) => {
            error!("failed to read Android event payload: {err}");
            return;
        }
    };

    match from_json::<ClientEvent>(&json) {
        Ok(event) => emit_event(handle, event),
        Err(err) => error!("discarding malformed Android location event: {err}"),
    }
}

#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_geokit_location_LocationBridge_dispatchError(
    mut env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jlong,
    message: JString<'_>,
) {
    #[allow(clippy::cast_sign_loss)]
    let handle = handle as u64;
    let message = match env.get_string(&message) {
        Ok(value) => value.to_string_lossy().into_owned(),
        Err(err) => {
            error!("failed to read Android error payload: {err}");
            return;
        }
    };

    error!("Android location bridge error (handle {handle}): {message}");
}

fn emit_event(handle: u64, event: ClientEvent) {
    let delegate = {
        let map = delegates().lock().expect("delegate map mutex poisoned");
        map.get(&handle).cloned()
    };

    if let Some(delegate) = delegate {
        delegate.on_event(event);
    } else {
        error!("received Android location event for unknown handle {handle}");
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> LocationResult<String> {
    serde_json::to_string(value).map_err(|err| LocationError::Serialization {
        message: err.to_string(),
    })
}

fn from_json<T: DeserializeOwned>(value: &str) -> LocationResult<T> {
    serde_json::from_str(value).map_err(|err| LocationError::Serialization {
        message: err.to_string(),
    })
}

#[allow(clippy::needless_pass_by_value)]
fn map_jni_error(err: jni::errors::Error) -> LocationError {
    LocationError::Platform {
        message: err.to_string(),
    }
}
