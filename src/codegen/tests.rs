use super::*;
use crate::config::OpcodeMode;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::tree::Node;

fn compile_with(source: &str, opts: &CompileOptions) -> Result<CompiledCoin, GenerationError> {
    let tokens = Lexer::new(source, 0).tokenize().unwrap();
    let coin = Parser::new(tokens).parse_coin().unwrap();
    generate(&coin, opts)
}

fn compile(source: &str) -> CompiledCoin {
    compile_with(source, &CompileOptions::default()).unwrap()
}

fn compile_err(source: &str) -> GenerationErrorKind {
    compile_with(source, &CompileOptions::default())
        .unwrap_err()
        .kind
}

fn main_text(source: &str) -> String {
    compile(source).main.program.to_string()
}

/// The condition of a lone `require(expr)` in a default action.
fn lowered(expr: &str) -> String {
    let coin = compile(&format!(
        "coin T {{ action default(int m, int n) {{ require({}); }} }}",
        expr
    ));
    coin.main.program.body().as_list().unwrap()[1].to_string()
}

fn hash_literal(byte: &str) -> String {
    format!("0x{}", byte.repeat(32))
}

// --- routing ---

#[test]
fn test_send_creates_coin() {
    let text = main_text("coin C { action t() { send(0xaaaa, 100); } }");
    assert_eq!(
        text,
        "(mod (action args) (include condition_codes.clib) \
         (if (= action \"t\") (list (list CREATE_COIN 0xaaaa 100)) (x \"unknown action\")))"
    );
}

#[test]
fn test_require_lowers_to_inline_if() {
    let owner = hash_literal("11");
    let source = format!(
        "coin Vault {{
            storage address owner = {owner};
            action withdraw(uint64 amount) {{
                require(msg.sender == owner, \"not owner\");
                send(owner, amount);
            }}
        }}"
    );
    let coin = compile(&source);
    let text = coin.main.program.to_string();
    assert!(text.starts_with("(mod (action args sender) "));
    assert!(text.contains(&format!("(if (= sender {owner}) (list ")));
    assert!(text.contains("(list AGG_SIG_ME sender (sha256 \"withdraw\"))"));
    assert!(text.contains(&format!("(list CREATE_COIN {owner} (f args))")));
    assert!(text.contains("(x \"not owner\")"));
    assert!(!text.contains("assert"));
    assert_eq!(coin.action("withdraw").unwrap().ambient, vec![Ambient::Sender]);
}

/// Follow the selector chain the way the VM would for `selector`.
fn route<'n>(mut node: &'n Node, selector: &str) -> &'n Node {
    while let Some([_, test, then, otherwise]) = node.as_list() {
        let chosen = match test.as_list() {
            Some([eq, action, name]) if eq.as_symbol() == Some("=") && action.as_symbol() == Some("action") => {
                name == &Node::str(selector)
            }
            _ => break,
        };
        node = if chosen { then } else { otherwise };
    }
    node
}

#[test]
fn test_unknown_selector_always_fails() {
    let coin = compile(
        "coin Four {
            action a1() { reserveFee(1); }
            action a2() { reserveFee(2); }
            action a3() { reserveFee(3); }
            action a4() { reserveFee(4); }
        }",
    );
    let body = coin.main.program.body();
    let failure = Node::call("x", vec![Node::str("unknown action")]);
    for selector in ["", "a5", "A1", "a", "a1 "] {
        assert_eq!(route(body, selector), &failure, "selector {:?}", selector);
    }
    for selector in ["a1", "a2", "a3", "a4"] {
        assert_ne!(route(body, selector), &failure);
    }
}

#[test]
fn test_default_action_takes_params_directly() {
    assert_eq!(
        main_text("coin D { action default(uint64 n) { require(n > 5); } }"),
        "(mod (n) (if (> n 5) () (x)))"
    );
}

#[test]
fn test_branch_comments_in_pretty_output() {
    let coin = compile("coin C { action pay(address to, uint64 amount) { send(to, amount); } action noop() {} }");
    let opts = CompileOptions {
        pretty: true,
        ..CompileOptions::default()
    };
    let text = coin.main.render(&opts);
    assert!(text.contains("; action pay(address to, uint64 amount)"));
    assert!(text.contains("; action noop()"));
}

// --- lowering table ---

#[test]
fn test_operator_lowering() {
    assert_eq!(lowered("m % n == 1"), "(= (r (divmod m n)) 1)");
    assert_eq!(lowered("m != n"), "(not (= m n))");
    assert_eq!(lowered("m < n"), "(> n m)");
    assert_eq!(lowered("m >= n"), "(not (> n m))");
    assert_eq!(lowered("m <= n"), "(not (> m n))");
    assert_eq!(lowered("m > 1 && n > 2"), "(all (> m 1) (> n 2))");
    assert_eq!(lowered("m > 1 || !(n > 2)"), "(any (> m 1) (not (> n 2)))");
    assert_eq!(lowered("(m >> 2) == (n << 1)"), "(= (ash m (- 0 2)) (ash n 1))");
    assert_eq!(lowered("-m == (~m & n)"), "(= (- 0 m) (logand (lognot m) n))");
    assert_eq!(lowered("(m | n) ^ 3 == 0"), "(logxor (logior m n) (= 3 0))");
    assert_eq!(lowered("m >s n"), "(>s m n)");
}

#[test]
fn test_string_plus_is_concat() {
    let coin = compile("coin T { action default(string s, uint64 k) { require(strlen(s + \"!\") > k + 1); } }");
    let cond = coin.main.program.body().as_list().unwrap()[1].to_string();
    assert_eq!(cond, "(> (strlen (concat s \"!\")) (+ k 1))");
}

#[test]
fn test_builtins_pull_in_libraries() {
    let coin = compile(
        "coin T { action default(bytes b) { require(and(sha256tree(b) == sha256(b), or(1, 0))); } }",
    );
    assert_eq!(
        coin.main.program.includes(),
        vec!["sha256tree.clib".to_string(), "utility_macros.clib".to_string()]
    );
    assert_eq!(
        compile_err("coin T { action default() { require(substr(1) == 1); } }"),
        GenerationErrorKind::ArityMismatch {
            name: "substr".into(),
            expected: "2 to 3".into(),
            found: 1
        }
    );
}

#[test]
fn test_merged_if_selects_values() {
    let text = main_text(
        "coin T { action default(int n) {
            let r = 0;
            if (n > 5) { r = 1; } else { let t = 7; r = t; }
            require(r == 1);
        } }",
    );
    assert_eq!(text, "(mod (n) (if (= (if (> n 5) 1 7) 1) () (x)))");
}

#[test]
fn test_if_with_conditions_joins_a_conditional_list() {
    let text = main_text(
        "coin T { action default(int n) {
            if (n > 5) { reserveFee(1); }
            reserveFee(2);
        } }",
    );
    assert_eq!(
        text,
        "(mod (n) (include condition_codes.clib) \
         (defun merge_list (a b) (if a (c (f a) (merge_list (r a) b)) b)) \
         (merge_list (if (> n 5) (list (list RESERVE_FEE 1)) ()) (list (list RESERVE_FEE 2))))"
    );
}

#[test]
fn test_sequential_ifs_grow_linearly() {
    let mut body = String::new();
    for i in 0..20 {
        body.push_str(&format!("if (x > {i}) {{ send(0xaa, {i}); }}\n"));
    }
    let coin = compile(&format!("coin T {{ action default(uint64 x) {{ {body} }} }}"));
    let text = coin.main.program.to_string();
    assert_eq!(text.matches("CREATE_COIN").count(), 20);
    assert!(text.len() < 4_000, "{} bytes", text.len());
    assert_eq!(coin.main.program.definition_names(), vec!["merge_list"]);
}

#[test]
fn test_require_inside_branch_guards_its_conditions() {
    let coin = compile(
        "coin T { action default(uint64 v) {
            if (v > 1) { require(v < 10, \"big\"); reserveFee(v); } else { reserveFee(1); }
            reserveFee(2);
        } }",
    );
    assert_eq!(
        coin.main.program.body().to_string(),
        "(merge_list (if (> v 1) (if (> 10 v) (list (list RESERVE_FEE v)) (x \"big\")) \
         (list (list RESERVE_FEE 1))) (list (list RESERVE_FEE 2)))"
    );
}

#[test]
fn test_conditional_send_counts_toward_conservation() {
    let coin = compile_with(
        "coin T { action default(int n) {
            if (n > 5) { send(0xaa, 3); }
            send(0xbb, 1);
        } }",
        &CompileOptions {
            conservation_check: true,
            ..CompileOptions::default()
        },
    )
    .unwrap();
    let text = coin.main.program.to_string();
    assert!(text.contains("(+ (if (> n 5) 3 0) 1)"));
    assert!(text.contains(
        "(merge_list (if (> n 5) (list (list CREATE_COIN 0xaa 3)) ()) (list (list CREATE_COIN 0xbb 1)))"
    ));
}

#[test]
fn test_block_let_shadows_until_the_block_ends() {
    let text = main_text(
        "coin T { action default(int n) {
            let x = 1;
            if (n > 0) { let x = 2; send(0xaa, x); }
            send(0xbb, x);
        } }",
    );
    assert!(text.contains("(if (> n 0) (list (list CREATE_COIN 0xaa 2)) ())"));
    assert!(text.contains("(list (list CREATE_COIN 0xbb 1))"));

    let text = main_text(
        "coin T { action default(int n) {
            let x = 1;
            if (n > 0) { let x = 2; send(0xaa, x); } else { exception(\"no\"); }
            send(0xbb, x);
        } }",
    );
    assert_eq!(
        text,
        "(mod (n) (include condition_codes.clib) \
         (if (> n 0) (list (list CREATE_COIN 0xaa 2) (list CREATE_COIN 0xbb 1)) (x \"no\")))"
    );

    let text = main_text(
        "coin T { action default(int n) {
            let x = 1;
            if (n > 0) { x = 2; } else { let x = 5; x = 6; }
            send(0xbb, x);
        } }",
    );
    assert!(text.ends_with("(list (list CREATE_COIN 0xbb (if (> n 0) 2 1))))"));
}

#[test]
fn test_exception_ends_the_path() {
    let text = main_text(
        "coin T { action default(int n) {
            if (n == 0) { exception(\"zero\"); }
            reserveFee(n);
        } }",
    );
    assert!(text.contains("(if (= n 0) (x \"zero\") (list (list RESERVE_FEE n)))"));
}

#[test]
fn test_emit_announces_event_hash() {
    let coin = compile(
        "coin T {
            event Paid(address to, uint64 amount);
            action default() { emit Paid(0xaa, 5); }
        }",
    );
    let text = coin.main.program.to_string();
    assert!(text.contains(
        "(list CREATE_PUZZLE_ANNOUNCEMENT (sha256tree (list \"Paid(address,uint64)\" 0xaa 5)))"
    ));
    assert_eq!(
        coin.main.program.includes(),
        vec!["condition_codes.clib".to_string(), "sha256tree.clib".to_string()]
    );
}

#[test]
fn test_numeric_opcodes_drop_condition_codes() {
    let opts = CompileOptions {
        opcodes: OpcodeMode::Numeric,
        ..CompileOptions::default()
    };
    let coin = compile_with("coin C { action t() { send(0xaaaa, 100); } }", &opts).unwrap();
    assert!(coin.main.program.includes().is_empty());
    let text = coin.main.render(&opts);
    assert!(text.contains("(list (list 51 0xaaaa 100))"));
    assert!(!text.contains("include"));

    // Auto mode keeps names because the library is included.
    let symbolic = compile("coin C { action t() { send(0xaaaa, 100); } }");
    assert!(symbolic
        .main
        .render(&CompileOptions::default())
        .contains("(list (list CREATE_COIN 0xaaaa 100))"));
}

// --- storage, constants, functions ---

#[test]
fn test_address_storage_decodes() {
    let text = main_text(
        "coin T {
            storage address burn = \"xch1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqm6ks6e8mvy\";
            action default(uint64 amount) { send(burn, amount); }
        }",
    );
    assert!(text.contains(&format!("(list CREATE_COIN {} amount)", hash_literal("00"))));

    assert!(matches!(
        compile_err("coin T { storage address a = \"xch1bad\"; action default() {} }"),
        GenerationErrorKind::InvalidAddress(_)
    ));
    assert!(matches!(
        compile_err("coin T { storage address a = \"alice\"; action default() {} }"),
        GenerationErrorKind::InvalidAddress(_)
    ));
}

#[test]
fn test_constants_substitute() {
    let text = main_text(
        "coin T {
            storage uint64 base = 3;
            const LIMIT = base * 2;
            action default(int n) { require(n < LIMIT); }
        }",
    );
    assert_eq!(text, "(mod (n) (if (> (* 3 2) n) () (x)))");
}

#[test]
fn test_functions_included_transitively() {
    let coin = compile(
        "coin F {
            function double(uint64 n) -> uint64 { return n * 2; }
            function quad(uint64 n) -> uint64 { return double(double(n)); }
            inline function unused(uint64 n) -> uint64 { return n; }
            function clamp(int n) -> int { if (n > 10) { return 10; } return n; }
            action default(uint64 v) { require(quad(v) > 10); }
        }",
    );
    let program = &coin.main.program;
    assert_eq!(program.definition_names(), vec!["double", "quad"]);
    assert_eq!(
        program.definitions()[0].to_string(),
        "(defun double (n) (* n 2))"
    );

    let coin = compile(
        "coin F {
            function clamp(int n) -> int { if (n > 10) { return 10; } return n; }
            inline function twice(int n) -> int { return n + n; }
            action default(int v) { require(clamp(twice(v)) == 10); }
        }",
    );
    let defs: Vec<String> = coin.main.program.definitions().iter().map(|d| d.to_string()).collect();
    assert_eq!(
        defs,
        vec![
            "(defun clamp (n) (if (> n 10) 10 n))".to_string(),
            "(defun-inline twice (n) (+ n n))".to_string(),
        ]
    );
}

// --- decorators ---

#[test]
fn test_modifier_wraps_body() {
    let text = main_text(
        "coin M {
            storage uint64 limit = 100;
            modifier below(uint64 cap) { require(cap < limit, \"over\"); _; }
            @below(50) action default() { reserveFee(1); }
        }",
    );
    assert_eq!(
        text,
        "(mod () (include condition_codes.clib) \
         (if (> 100 50) (list (list RESERVE_FEE 1)) (x \"over\")))"
    );
}

#[test]
fn test_modifier_code_after_placeholder() {
    let text = main_text(
        "coin M {
            modifier fee() { _; reserveFee(9); }
            @fee action default() { reserveFee(1); }
        }",
    );
    assert!(text.ends_with("(list (list RESERVE_FEE 1) (list RESERVE_FEE 9)))"));
}

#[test]
fn test_only_address_guard() {
    let id = hash_literal("11");
    let text = main_text(&format!(
        "coin A {{ @onlyAddress({id}) action default() {{ reserveFee(1); }} }}"
    ));
    assert_eq!(
        text,
        format!(
            "(mod (sender) (include condition_codes.clib) \
             (if (= sender {id}) \
             (list (list AGG_SIG_ME sender (sha256 \"default\")) (list RESERVE_FEE 1)) \
             (x \"unauthorized\")))"
        )
    );

    let other = hash_literal("22");
    let text = main_text(&format!(
        "coin A {{ @onlyAddress({id}, {other}) action default() {{ }} }}"
    ));
    assert!(text.contains(&format!("(any (= sender {id}) (= sender {other}))")));
}

#[test]
fn test_conservation_check() {
    let opts = CompileOptions {
        conservation_check: true,
        ..CompileOptions::default()
    };
    let coin = compile_with(
        "coin T { action default() { send(0xaa, 10); send(0xbb, 5); } }",
        &opts,
    )
    .unwrap();
    assert_eq!(
        coin.main.program.to_string(),
        "(mod (my_amount) (include condition_codes.clib) \
         (if (> (+ 10 5) my_amount) (x \"insufficient amount\") \
         (list (list ASSERT_MY_AMOUNT my_amount) (list CREATE_COIN 0xaa 10) (list CREATE_COIN 0xbb 5))))"
    );
}

#[test]
fn test_ambient_members() {
    let coin = compile(
        "coin T { action default() { require(coin.amount > 0); require(coin.id != coin.puzzleHash); } }",
    );
    assert_eq!(
        coin.main.program.params(),
        vec!["my_amount", "my_puzzle_hash", "my_coin_id"]
    );
    let text = coin.main.program.to_string();
    assert!(text.contains("(list ASSERT_MY_AMOUNT my_amount)"));
    assert!(text.contains("(list ASSERT_MY_PUZZLEHASH my_puzzle_hash)"));
    assert!(text.contains("(list ASSERT_MY_COIN_ID my_coin_id)"));
}

#[test]
fn test_singleton_launcher() {
    let coin = compile("@singleton coin S { action default() {} }");
    let launcher = coin.launcher.as_ref().unwrap();
    assert_eq!(
        launcher.program.params(),
        vec!["singleton_puzzle_hash", "amount", "key_value_list"]
    );
    assert_eq!(
        launcher.program.includes(),
        vec!["condition_codes.clib".to_string(), "sha256tree.clib".to_string()]
    );
    assert!(coin.launcher_id.is_none());

    let id = hash_literal("ab");
    let coin = compile(&format!("@singleton({id}) coin S {{ action default() {{}} }}"));
    assert_eq!(coin.launcher_id, Some(Node::bytes(vec![0xab; 32])));
    assert_eq!(coin.programs().count(), 2);
    let fixed = coin.launcher.as_ref().unwrap();
    assert_eq!(
        fixed.program.params(),
        vec!["singleton_puzzle_hash", "amount", "key_value_list"]
    );
    assert!(fixed
        .program
        .to_string()
        .contains(&format!("(list ASSERT_MY_COIN_ID {id})")));
    assert_ne!(fixed.tree_hash(), launcher.tree_hash());

    let other = compile(&format!(
        "@singleton({}) coin S {{ action default() {{}} }}",
        hash_literal("cd")
    ));
    assert_ne!(other.launcher.as_ref().unwrap().tree_hash(), fixed.tree_hash());
}

// --- stateful actions ---

const COUNTER: &str = "coin Counter {
    state { uint64 count; address owner; uint64 total; }
    @stateful action bump(uint64 by) {
        state.total = state.total + by;
        state.count += 1;
    }
    @stateful action reset() {
        require(msg.sender == state.owner);
        state.count = 0;
    }
    action peek() { reserveFee(0); }
}";

#[test]
fn test_state_access_is_positional() {
    let coin = compile(COUNTER);
    let bump = coin.action("bump").unwrap().program.as_ref().unwrap();
    assert_eq!(
        bump.program.to_string(),
        "(mod (state args) (c (list (+ (f state) 1) (f (r state)) (+ (f (r (r state))) (f args))) ()))"
    );
}

#[test]
fn test_stateful_coin_commits_every_action() {
    let coin = compile(COUNTER);
    let layer = coin.layer.as_ref().unwrap();
    assert_eq!(layer.tree().len(), 3);
    assert_eq!(&coin.main.program, layer.wrapper());

    let reset = coin.action("reset").unwrap();
    assert_eq!(reset.ambient, vec![Ambient::Sender]);
    let text = reset.program.as_ref().unwrap().program.to_string();
    assert!(text.contains("(= (f args) (f (r state)))"));
    assert!(text.contains("(list AGG_SIG_ME (f args) (sha256 \"reset\"))"));

    let peek = coin.action("peek").unwrap().program.as_ref().unwrap();
    assert!(peek.program.to_string().contains("(c (list (f state) (f (r state)) (f (r (r state)))) (list (list RESERVE_FEE 0)))"));

    for (i, action) in layer.actions().iter().enumerate() {
        let proof = layer.tree().proof(i).unwrap();
        assert!(crate::layer::verify_inclusion(
            &layer.action_root(),
            &action.program.tree_hash(),
            &proof
        ));
    }

    let owner = Node::bytes(vec![0x11; 32]);
    let spend = layer
        .spend("reset", &[Node::int(4), owner.clone(), Node::int(9)], vec![owner], 1)
        .unwrap();
    assert_eq!(
        crate::tree::tree_hash(&spend.puzzle_reveal),
        layer
            .puzzle_hash(&[Node::int(4), Node::bytes(vec![0x11; 32]), Node::int(9)])
            .unwrap()
    );
}

// --- errors ---

#[test]
fn test_generation_errors() {
    use GenerationErrorKind as K;
    let cases: Vec<(&str, K)> = vec![
        (
            "coin T { action default() { require(zzz == 1); } }",
            K::UnknownIdentifier("zzz".into()),
        ),
        (
            "coin T { action default() { require(missing(1)); } }",
            K::UnknownFunction("missing".into()),
        ),
        (
            "coin T { action default() { require(msg.origin == 1); } }",
            K::UnknownMember {
                object: "msg".into(),
                field: "origin".into(),
            },
        ),
        (
            "coin T { state { uint64 c; } action a() { state.c = 1; } }",
            K::StateOutsideStateful("c".into()),
        ),
        (
            "coin T { state { uint64 c; } @stateful action a() { state.d = 1; } }",
            K::UnknownMember {
                object: "state".into(),
                field: "d".into(),
            },
        ),
        (
            "coin T { storage uint64 cap = 5; action a() { cap = 6; } }",
            K::ImmutableAssignment("cap".into()),
        ),
        (
            "coin T { action a(uint64 n) { n += 1; } }",
            K::ImmutableAssignment("n".into()),
        ),
        (
            "coin T { action a() { y = 1; } }",
            K::UndeclaredAssignment("y".into()),
        ),
        (
            "coin T { @frozen action a() {} }",
            K::UnknownDecorator("frozen".into()),
        ),
        (
            "@frozen coin T { action a() {} }",
            K::UnknownDecorator("frozen".into()),
        ),
        (
            "coin T { @singleton action a() {} }",
            K::BadDecoratorTarget {
                decorator: "singleton".into(),
                target: "an action".into(),
            },
        ),
        (
            "@stateful coin T { action a() {} }",
            K::BadDecoratorTarget {
                decorator: "stateful".into(),
                target: "a coin".into(),
            },
        ),
        (
            "coin T { @stateful(1) action a() {} }",
            K::ArityMismatch {
                name: "stateful".into(),
                expected: "0".into(),
                found: 1,
            },
        ),
        (
            "coin T { action a() { emit Foo(1); } }",
            K::UnknownEvent("Foo".into()),
        ),
        (
            "coin T { event Paid(uint64 amount); action a() { emit Paid(1, 2); } }",
            K::ArityMismatch {
                name: "Paid".into(),
                expected: "1".into(),
                found: 2,
            },
        ),
        (
            "coin T { function f(uint64 n) -> uint64 { send(0xaa, n); return n; } action a() {} }",
            K::ConditionOutsideAction("send".into()),
        ),
        (
            "coin T { function f() { reserveFee(1); } action a() {} }",
            K::ConditionOutsideAction("reserveFee".into()),
        ),
        (
            "coin T { action a() {} action a() {} }",
            K::Duplicate("a".into()),
        ),
        (
            "coin T { storage uint64 x = 1; const x = 2; action a() {} }",
            K::Duplicate("x".into()),
        ),
        (
            "coin T { function merge_list(int a) -> int { return a; } action a() {} }",
            K::Duplicate("merge_list".into()),
        ),
        ("coin T { }", K::NoActions("T".into())),
        (
            "coin T { storage uint64 cap = 1 + 2; action a() {} }",
            K::NonLiteralStorage("cap".into()),
        ),
        (
            "coin T { modifier m() { require(true); } action a() {} }",
            K::Placeholder {
                name: "m".into(),
                found: 0,
            },
        ),
    ];
    for (source, expected) in cases {
        assert_eq!(compile_err(source), expected, "{}", source);
    }
}

#[test]
fn test_generator_depth_limit() {
    let opts = CompileOptions {
        max_depth: 4,
        ..CompileOptions::default()
    };
    let err = compile_with(
        "coin T { action default() { require(1 + 1 + 1 + 1 + 1 + 1 == 6); } }",
        &opts,
    )
    .unwrap_err();
    assert_eq!(err.kind, GenerationErrorKind::TooDeep(4));
}

#[test]
fn test_errors_carry_spans() {
    let source = "coin T { action default() { require(zzz == 1); } }";
    let err = compile_with(source, &CompileOptions::default()).unwrap_err();
    let start = source.find("zzz").unwrap() as u32;
    assert_eq!((err.span.start, err.span.end), (start, start + 3));
}
