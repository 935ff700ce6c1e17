use serde_json::{json, Value};

use mat_lang::{
    compile,
    compiler::types::WidthProfile,
    diagnostics::ErrorHandler,
    parse_unit, Emit, Format, Options, Output, PipelineError,
};

fn int() -> Value {
    json!({"integer": {"rank": "int", "signed": true}})
}

fn char_ptr() -> Value {
    json!({"pointer": {"integer": {"rank": "char", "signed": true}}})
}

fn var(id: u32, ty: Value) -> Value {
    json!({"kind": {"node": "var", "entity": id}, "ty": ty})
}

fn ret(expr: Value) -> Value {
    json!({"kind": {"node": "return", "expr": expr}})
}

/// `int counter = 3; int add(int a, int b) { return a + b; }`
fn adder() -> Value {
    let fn_ty = json!({"function": {"ret": int(), "params": [int(), int()]}});
    let sum = json!({
        "kind": {"node": "binary", "op": "add", "lhs": var(1, int()), "rhs": var(2, int())},
        "ty": int(),
    });
    json!({
        "program": {
            "entities": [
                {
                    "name": "add",
                    "type": fn_ty,
                    "kind": {
                        "entity": "defined_function",
                        "params": [1, 2],
                        "body": {"stmts": [ret(sum)]},
                    },
                },
                {"name": "a", "type": int(), "kind": {"entity": "parameter"}},
                {"name": "b", "type": int(), "kind": {"entity": "parameter"}},
                {
                    "name": "counter",
                    "type": int(),
                    "kind": {
                        "entity": "defined_variable",
                        "initializer": {"kind": {"node": "int", "value": 3}, "ty": int()},
                    },
                },
            ],
            "declarations": [3, 0],
        }
    })
}

fn run(unit: Value, options: &Options) -> (Result<Output, PipelineError>, ErrorHandler) {
    let unit = parse_unit(&unit.to_string(), Format::Json).unwrap();
    let mut handler = ErrorHandler::new();
    let result = compile(unit, options, &mut handler);
    (result, handler)
}

fn assembly(unit: Value) -> String {
    let (result, handler) = run(unit, &Options::default());
    assert!(!handler.error_occurred(), "{:?}", handler.diagnostics());
    result.unwrap().render(Format::Json).unwrap()
}

#[test]
fn compiles_a_function_and_a_global() {
    let asm = assembly(adder());
    assert!(asm.contains("\t.data\n\t.globl\tcounter\n"));
    assert!(asm.contains("counter:\n\t.long\t3\n"));
    assert!(asm.contains("\t.text\n\t.globl\tadd\n\t.type\tadd,@function\nadd:\n"));
    assert!(asm.contains("\tpushl\t%ebp\n\tmovl\t%esp, %ebp\n"));
    assert!(asm.contains("\tmovl\t12(%ebp), %eax\n"));
    assert!(asm.contains("\tmovl\t8(%ebp), %eax\n"));
    assert!(asm.contains("\taddl\t%ecx, %eax\n"));
    assert!(asm.contains("\tmovl\t%ebp, %esp\n\tpopl\t%ebp\n\tret\n\t.size\tadd, .-add\n"));
}

#[test]
fn string_literals_and_calls_to_undefined_functions() {
    let puts_ty = json!({"function": {"ret": int(), "params": [char_ptr()]}});
    let main_ty = json!({"function": {"ret": int(), "params": []}});
    let hello = json!({"kind": {"node": "str", "value": "hello"}, "ty": char_ptr()});
    let call = json!({
        "kind": {"node": "call", "callee": var(0, puts_ty.clone()), "args": [hello]},
        "ty": int(),
    });
    let unit = json!({
        "program": {
            "entities": [
                {"name": "puts", "type": puts_ty, "kind": {"entity": "undefined_function"}},
                {
                    "name": "main",
                    "type": main_ty,
                    "kind": {
                        "entity": "defined_function",
                        "params": [],
                        "body": {"stmts": [
                            {"kind": {"node": "expr", "expr": call}},
                            ret(json!({"kind": {"node": "int", "value": 0}, "ty": int()})),
                        ]},
                    },
                },
            ],
            "declarations": [0, 1],
        }
    });

    let asm = assembly(unit);
    assert!(asm.contains("\t.section\t.rodata\n.LC0:\n\t.string\t\"hello\"\n"));
    assert!(asm.contains("\tcall\tputs\n\taddl\t$4, %esp\n"));
    assert!(asm.contains("\tmovl\t$0, %eax\n"));
}

#[test]
fn verbose_assembly_carries_locations() {
    let mut unit = adder();
    unit["program"]["entities"][0]["kind"]["body"]["stmts"][0]["location"] =
        json!({"line": 1, "column": 30});
    let options = Options {
        verbose_asm: true,
        ..Options::default()
    };
    let (result, _) = run(unit, &options);
    let asm = result.unwrap().render(Format::Json).unwrap();
    assert!(asm.contains("# L1:30: "));
}

#[test]
fn type_dump() {
    let mut unit = adder();
    unit["types"] = json!([{
        "kind": "struct",
        "name": "point",
        "members": [
            {"name": "tag", "ty": {"integer": {"rank": "char", "signed": true}}},
            {"name": "x", "ty": int()},
        ],
    }]);
    let options = Options {
        emit: Emit::Types,
        ..Options::default()
    };
    let (result, handler) = run(unit, &options);
    assert!(!handler.error_occurred());
    let text = result.unwrap().render(Format::Json).unwrap();
    let dump: Value = serde_json::from_str(&text).unwrap();
    let point = dump
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "struct point")
        .unwrap();
    assert_eq!(point["size"], 8);
    assert_eq!(point["alignment"], 4);
    assert_eq!(point["offsets"], json!([0, 4]));
}

#[test]
fn mir_dump_in_yaml() {
    let options = Options {
        emit: Emit::Mir,
        ..Options::default()
    };
    let (result, handler) = run(adder(), &options);
    assert!(!handler.error_occurred());
    let output = result.unwrap();
    match &output {
        Output::Mir(mir) => assert_eq!(mir.functions.len(), 1),
        o => panic!("Expected MIR, got {:?}", o),
    }
    assert!(output.render(Format::Yaml).unwrap().contains("functions"));
}

#[test]
fn other_profiles_stop_before_assembly() {
    let options = Options {
        profile: WidthProfile::LP64,
        ..Options::default()
    };
    let (result, _) = run(adder(), &options);
    assert_eq!(result.unwrap_err(), PipelineError::UnsupportedProfile("lp64".into()));

    let options = Options {
        profile: WidthProfile::LP64,
        emit: Emit::Mir,
        ..Options::default()
    };
    let (result, _) = run(adder(), &options);
    assert!(result.is_ok());
}

#[test]
fn recursive_struct_is_a_type_error() {
    let mut unit = adder();
    unit["types"] = json!([{
        "kind": "struct",
        "name": "node",
        "members": [{"name": "next", "ty": {"struct": "node"}}],
    }]);
    let (result, handler) = run(unit, &Options::default());
    assert_eq!(result.unwrap_err(), PipelineError::TypeCheck(1));
    let err = handler.errors().next().unwrap();
    assert!(err.message.contains("recursive type definition"));
}

#[test]
fn break_outside_a_loop_is_reported() {
    let mut unit = adder();
    let body = &mut unit["program"]["entities"][0]["kind"]["body"]["stmts"];
    *body = json!([
        {"kind": {"node": "break"}, "location": {"line": 2, "column": 5}},
        ret(json!({"kind": {"node": "int", "value": 0}, "ty": int()})),
    ]);
    let (result, handler) = run(unit, &Options::default());
    assert_eq!(result.unwrap_err(), PipelineError::Semantic(1));
    assert_eq!(
        handler.errors().next().unwrap().to_string(),
        "L2:5: error: break from out of loop"
    );
}

#[test]
fn malformed_units_are_rejected() {
    assert!(parse_unit("{\"program\": 1}", Format::Json).is_err());
    assert!(parse_unit("program: [", Format::Yaml).is_err());
}

#[test]
fn char_array_initialized_from_a_shorter_string() {
    let char_ty = json!({"integer": {"rank": "char", "signed": true}});
    let main_ty = json!({"function": {"ret": int(), "params": []}});
    let hi = json!({"kind": {"node": "str", "value": "hi"}, "ty": char_ptr()});
    let unit = json!({
        "program": {
            "entities": [
                {
                    "name": "main",
                    "type": main_ty,
                    "kind": {
                        "entity": "defined_function",
                        "params": [],
                        "body": {
                            "variables": [1],
                            "stmts": [ret(json!({"kind": {"node": "int", "value": 0}, "ty": int()}))],
                        },
                    },
                },
                {
                    "name": "buf",
                    "type": {"array": [char_ty, 8]},
                    "kind": {"entity": "defined_variable", "initializer": hi},
                },
            ],
            "declarations": [0],
        }
    });

    let asm = assembly(unit);
    assert!(asm.contains(".LC0:\n\t.string\t\"hi\"\n"));
    assert!(asm.contains("\tmovb\t.LC0+2, %al\n\tmovb\t%al, -6(%ebp)\n"));
    assert!(!asm.contains(".LC0+3"));
    assert!(asm.contains("\tmovl\t$0, %eax\n\tmovb\t%al, -1(%ebp)\n"));
}
