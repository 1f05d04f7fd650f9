//! The general call protocol.
//!
//! Everything here re-resolves on every call. Call sites land here when a
//! construction is ineligible for specialization or the callee is neither a
//! type nor a function.

use crate::binder::CallSignature;
use crate::context::CodeContext;
use crate::error::VmResult;
use ember_runtime::{CallArgs, RuntimeError, SlotName, TypeObject, Value};
use std::sync::Arc;

/// Call `callee` with raw site arguments laid out per `signature`.
pub fn invoke(
    ctx: &CodeContext,
    callee: &Value,
    signature: &CallSignature,
    args: &[Value],
) -> VmResult<Value> {
    let call_args = signature.to_call_args(args)?;
    call_object(ctx, callee, call_args)
}

/// Call any callable value.
pub fn call_object(ctx: &CodeContext, callee: &Value, args: CallArgs) -> VmResult<Value> {
    match callee {
        Value::Type(ty) => construct(ctx, ty, args),
        Value::Function(func) => Ok(func.call(&args)?),
        Value::Builtin(builtin) => Ok(builtin.call(&args)?),
        Value::StaticMethod(sm) => call_object(ctx, sm.func(), args),
        other => Err(RuntimeError::NotCallable {
            type_name: other.type_name(),
        }
        .into()),
    }
}

/// `cls(*args, **kwargs)` through full resolution.
pub fn construct(ctx: &CodeContext, cls: &Arc<TypeObject>, args: CallArgs) -> VmResult<Value> {
    let receiver = Value::Type(cls.clone());

    if let Some(meta) = cls.metaclass()
        && let Some(call) = meta.lookup(&SlotName::Call.interned())
    {
        return call_object(ctx, &call, args.with_receiver(receiver));
    }

    let Some(new) = cls.lookup(&SlotName::New.interned()) else {
        return Err(RuntimeError::NotInstantiable {
            type_name: cls.name().to_string(),
        }
        .into());
    };
    let instance = call_new(ctx, cls, &new, args.clone())?;

    // Initialization only applies to instances of the requested class.
    if !instance.is_instance_of(cls) {
        return Ok(instance);
    }

    let owner = match &instance {
        Value::Instance(inst) => inst.class().clone(),
        _ => cls.clone(),
    };
    if let Some(init) = owner.lookup(&SlotName::Init.interned()) {
        let result = call_init(ctx, &owner, &init, instance.clone(), args)?;
        if !result.is_none() {
            return Err(RuntimeError::InitReturnedNonNone {
                type_name: result.type_name(),
            }
            .into());
        }
    }
    Ok(instance)
}

/// `__new__` is looked up on the class and always receives it first.
fn call_new(
    ctx: &CodeContext,
    cls: &Arc<TypeObject>,
    new: &Value,
    args: CallArgs,
) -> VmResult<Value> {
    let receiver = Value::Type(cls.clone());
    match new {
        Value::StaticMethod(sm) => call_object(ctx, sm.func(), args.with_receiver(receiver)),
        Value::ClassMethod(cm) => call_object(
            ctx,
            cm.func(),
            args.with_receiver(receiver.clone()).with_receiver(receiver),
        ),
        other => call_object(ctx, other, args.with_receiver(receiver)),
    }
}

/// `__init__` is bound to the instance like any method.
fn call_init(
    ctx: &CodeContext,
    owner: &Arc<TypeObject>,
    init: &Value,
    instance: Value,
    args: CallArgs,
) -> VmResult<Value> {
    match init {
        Value::Function(_) | Value::Builtin(_) => {
            call_object(ctx, init, args.with_receiver(instance))
        }
        Value::StaticMethod(sm) => call_object(ctx, sm.func(), args),
        Value::ClassMethod(cm) => {
            call_object(ctx, cm.func(), args.with_receiver(Value::Type(owner.clone())))
        }
        other => call_object(ctx, other, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FastBindConfig;
    use crate::fast_bind::FastBinder;
    use ember_runtime::{ClassMethod, FunctionObject, StaticMethod, intern};

    fn ctx() -> CodeContext {
        let binder = FastBinder::new(FastBindConfig::disabled()).unwrap();
        CodeContext::with_binder("fallback", Arc::new(binder))
    }

    fn point() -> Arc<TypeObject> {
        let init = FunctionObject::new("__init__", &["self", "x", "y"], |args| {
            let inst = args[0].as_instance().ok_or_else(|| RuntimeError::type_error("self"))?;
            inst.set_attr(intern("x"), args[1].clone());
            inst.set_attr(intern("y"), args[2].clone());
            Ok(Value::None)
        });
        TypeObject::builder("Point")
            .attr("__init__", Value::Function(init))
            .build()
            .unwrap()
    }

    #[test]
    fn test_construct_runs_init() {
        let ty = point();
        let out = construct(&ctx(), &ty, CallArgs::positional([Value::Int(3), Value::Int(4)]))
            .unwrap();
        let inst = out.as_instance().unwrap();
        assert_eq!(inst.get_attr(&intern("x")), Some(Value::Int(3)));
        assert_eq!(inst.get_attr(&intern("y")), Some(Value::Int(4)));
    }

    #[test]
    fn test_init_must_return_none() {
        let init = FunctionObject::new("__init__", &["self"], |_| Ok(Value::Int(1)));
        let ty = TypeObject::builder("Bad")
            .attr("__init__", Value::Function(init))
            .build()
            .unwrap();
        let err = construct(&ctx(), &ty, CallArgs::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: __init__() should return None, not 'int'"
        );
    }

    #[test]
    fn test_no_arguments_error() {
        let ty = TypeObject::builder("Empty").build().unwrap();
        let err = construct(&ctx(), &ty, CallArgs::positional([Value::Int(1)])).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Empty() takes no arguments");
    }

    #[test]
    fn test_foreign_new_result_skips_init() {
        let new = FunctionObject::with_varargs("__new__", &["cls"], |_| Ok(Value::Int(42)));
        let init = FunctionObject::new("__init__", &["self"], |_| {
            Err(RuntimeError::type_error("init must not run"))
        });
        let ty = TypeObject::builder("Odd")
            .attr("__new__", Value::StaticMethod(StaticMethod::new(Value::Function(new))))
            .attr("__init__", Value::Function(init))
            .build()
            .unwrap();
        assert_eq!(construct(&ctx(), &ty, CallArgs::new()).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_classmethod_new_receives_class_twice() {
        let new = FunctionObject::new("__new__", &["mcls", "cls"], |args| {
            assert!(args[0].is(&args[1]));
            Ok(Value::None)
        });
        let ty = TypeObject::builder("CM")
            .attr("__new__", Value::ClassMethod(ClassMethod::new(Value::Function(new))))
            .build()
            .unwrap();
        assert!(construct(&ctx(), &ty, CallArgs::new()).unwrap().is_none());
    }

    #[test]
    fn test_metaclass_call_intercepts() {
        let call = FunctionObject::new("__call__", &["cls"], |_| Ok(Value::str("made")));
        let meta = TypeObject::builder("Meta")
            .attr("__call__", Value::Function(call))
            .build()
            .unwrap();
        let ty = TypeObject::builder("WithMeta").metaclass(meta).build().unwrap();
        assert_eq!(construct(&ctx(), &ty, CallArgs::new()).unwrap(), Value::str("made"));
    }

    #[test]
    fn test_inherited_metaclass_call_intercepts() {
        let call = FunctionObject::new("__call__", &["cls"], |_| Ok(Value::str("made")));
        let meta = TypeObject::builder("Meta")
            .attr("__call__", Value::Function(call))
            .build()
            .unwrap();
        let base = TypeObject::builder("Base").metaclass(meta).build().unwrap();
        let sub = TypeObject::builder("Sub").base(base).build().unwrap();
        assert_eq!(construct(&ctx(), &sub, CallArgs::new()).unwrap(), Value::str("made"));
    }

    #[test]
    fn test_not_callable() {
        let err = call_object(&ctx(), &Value::Int(1), CallArgs::new()).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: 'int' object is not callable");
    }
}
