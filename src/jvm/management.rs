//! `java.lang.management` over JNI.
//!
//! Every call runs on the thread that raised the event. Lookups and calls
//! that leave an exception pending are reported as [`HostError::Jni`] after
//! the exception has been described and cleared, so the next JNI call is
//! legal again.

use std::path::Path;

use crate::env::{JniEnv, LocalRef};
use crate::error::HostError;
use crate::host::{HeapDumper, MemoryUsage, PoolUsage, RuntimeTelemetry};
use crate::sys::jni::{jmethodID, jobject, jvalue, JNI_TRUE};

const MANAGEMENT_FACTORY: &str = "java/lang/management/ManagementFactory";
const MEMORY_MXBEAN: &str = "java/lang/management/MemoryMXBean";
const MEMORY_POOL_MXBEAN: &str = "java/lang/management/MemoryPoolMXBean";
const MEMORY_USAGE: &str = "java/lang/management/MemoryUsage";
const HOTSPOT_DIAGNOSTIC_MXBEAN: &str = "com/sun/management/HotSpotDiagnosticMXBean";
const LIST: &str = "java/util/List";

const MEMORY_USAGE_SIG: &str = "()Ljava/lang/management/MemoryUsage;";

pub struct Management<'a> {
    jni: &'a JniEnv,
}

impl<'a> Management<'a> {
    pub fn new(jni: &'a JniEnv) -> Self {
        Self { jni }
    }

    fn check(&self, what: &str) -> Result<(), HostError> {
        if self.jni.take_exception() {
            Err(HostError::Jni(format!("{} threw an exception", what)))
        } else {
            Ok(())
        }
    }

    fn class(&self, name: &str) -> Result<LocalRef<'a>, HostError> {
        match self.jni.find_class(name) {
            Some(class) => Ok(LocalRef::new(self.jni, class)),
            None => {
                self.jni.take_exception();
                Err(HostError::Jni(format!("class {} not found", name)))
            }
        }
    }

    fn method(&self, class: &LocalRef<'_>, name: &str, sig: &str) -> Result<jmethodID, HostError> {
        self.jni.get_method_id(class.get(), name, sig).ok_or_else(|| {
            self.jni.take_exception();
            HostError::Jni(format!("method {}{} not found", name, sig))
        })
    }

    fn static_method(
        &self,
        class: &LocalRef<'_>,
        name: &str,
        sig: &str,
    ) -> Result<jmethodID, HostError> {
        self.jni.get_static_method_id(class.get(), name, sig).ok_or_else(|| {
            self.jni.take_exception();
            HostError::Jni(format!("static method {}{} not found", name, sig))
        })
    }

    /// Wraps a returned object, rejecting a pending exception or null.
    fn returned(&self, obj: jobject, what: &str) -> Result<LocalRef<'a>, HostError> {
        let obj = LocalRef::new(self.jni, obj);
        self.check(what)?;
        if obj.get().is_null() {
            return Err(HostError::Jni(format!("{} returned null", what)));
        }
        Ok(obj)
    }

    fn memory_mxbean(&self) -> Result<LocalRef<'a>, HostError> {
        let factory = self.class(MANAGEMENT_FACTORY)?;
        let get = self.static_method(
            &factory,
            "getMemoryMXBean",
            "()Ljava/lang/management/MemoryMXBean;",
        )?;
        let bean = self.jni.call_static_object_method(factory.get(), get, &[]);
        self.returned(bean, "ManagementFactory.getMemoryMXBean")
    }

    fn bean_usage(&self, getter: &str) -> Result<MemoryUsage, HostError> {
        let bean = self.memory_mxbean()?;
        let class = self.class(MEMORY_MXBEAN)?;
        let get = self.method(&class, getter, MEMORY_USAGE_SIG)?;
        let usage = self.jni.call_object_method(bean.get(), get, &[]);
        let usage = self.returned(usage, getter)?;
        self.read_usage(&usage)
    }

    fn read_usage(&self, usage: &LocalRef<'_>) -> Result<MemoryUsage, HostError> {
        let class = self.class(MEMORY_USAGE)?;
        let field = |name: &str| -> Result<i64, HostError> {
            let get = self.method(&class, name, "()J")?;
            let value = self.jni.call_long_method(usage.get(), get, &[]);
            self.check(name)?;
            Ok(value)
        };

        Ok(MemoryUsage {
            init: field("getInit")?,
            used: field("getUsed")?,
            committed: field("getCommitted")?,
            max: field("getMax")?,
        })
    }

    fn pool_usage(&self, pool: &LocalRef<'_>) -> Result<Option<PoolUsage>, HostError> {
        let class = self.class(MEMORY_POOL_MXBEAN)?;

        let get_name = self.method(&class, "getName", "()Ljava/lang/String;")?;
        let name = self.jni.call_object_method(pool.get(), get_name, &[]);
        let name = self.returned(name, "MemoryPoolMXBean.getName")?;
        let name = self
            .jni
            .get_string_utf(name.get())
            .ok_or_else(|| HostError::Jni("pool name is not readable".to_string()))?;

        let get_usage = self.method(&class, "getUsage", MEMORY_USAGE_SIG)?;
        let usage = LocalRef::new(self.jni, self.jni.call_object_method(pool.get(), get_usage, &[]));
        self.check("MemoryPoolMXBean.getUsage")?;
        // null once a pool has been invalidated
        if usage.get().is_null() {
            return Ok(None);
        }

        Ok(Some(PoolUsage { name, usage: self.read_usage(&usage)? }))
    }
}

impl RuntimeTelemetry for Management<'_> {
    fn heap_memory_usage(&self) -> Result<MemoryUsage, HostError> {
        self.bean_usage("getHeapMemoryUsage")
    }

    fn non_heap_memory_usage(&self) -> Result<MemoryUsage, HostError> {
        self.bean_usage("getNonHeapMemoryUsage")
    }

    fn memory_pools(&self) -> Result<Vec<PoolUsage>, HostError> {
        let factory = self.class(MANAGEMENT_FACTORY)?;
        let get = self.static_method(&factory, "getMemoryPoolMXBeans", "()Ljava/util/List;")?;
        let list = self.jni.call_static_object_method(factory.get(), get, &[]);
        let list = self.returned(list, "ManagementFactory.getMemoryPoolMXBeans")?;

        let list_class = self.class(LIST)?;
        let size = self.method(&list_class, "size", "()I")?;
        let get = self.method(&list_class, "get", "(I)Ljava/lang/Object;")?;

        let len = self.jni.call_int_method(list.get(), size, &[]);
        self.check("List.size")?;

        let mut pools = Vec::with_capacity(len.max(0) as usize);
        for i in 0..len {
            let pool = self.jni.call_object_method(list.get(), get, &[jvalue { i }]);
            let pool = self.returned(pool, "List.get")?;
            if let Some(usage) = self.pool_usage(&pool)? {
                pools.push(usage);
            }
        }
        Ok(pools)
    }
}

impl HeapDumper for Management<'_> {
    fn dump_heap(&self, path: &Path) -> Result<(), HostError> {
        let path = path
            .to_str()
            .ok_or_else(|| HostError::Unavailable(format!("{} is not valid UTF-8", path.display())))?;

        let factory = self.class(MANAGEMENT_FACTORY)?;
        let get_platform = self.static_method(
            &factory,
            "getPlatformMXBean",
            "(Ljava/lang/Class;)Ljava/lang/management/PlatformManagedObject;",
        )?;
        let diagnostic_class = self.class(HOTSPOT_DIAGNOSTIC_MXBEAN)?;
        let bean = self.jni.call_static_object_method(
            factory.get(),
            get_platform,
            &[jvalue { l: diagnostic_class.get() }],
        );
        let bean = self.returned(bean, "ManagementFactory.getPlatformMXBean")?;

        let dump = self.method(&diagnostic_class, "dumpHeap", "(Ljava/lang/String;Z)V")?;
        let file = self
            .jni
            .new_string_utf(path)
            .ok_or_else(|| {
                self.jni.take_exception();
                HostError::Jni("cannot create heap dump path string".to_string())
            })?;
        let file = LocalRef::new(self.jni, file);

        self.jni.call_void_method(
            bean.get(),
            dump,
            &[jvalue { l: file.get() }, jvalue { z: JNI_TRUE }],
        );
        self.check("HotSpotDiagnosticMXBean.dumpHeap")
    }
}
