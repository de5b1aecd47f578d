use crate::ast::{AttributeValue, Command, Declaration, Expr, Keyword, Pos, Sort, Symbol};
use crate::error::{TranslateError, TransportError};
use crate::known_atoms::KnownAtoms;
use crate::response::{ErrorResponse, Response, Verdict};
use crate::sexpr::{Parser, SExpr};
use crate::source::Source;
use crate::translate::Translator;
use crate::transport::{ProcessTransport, Transport};
use std::collections::HashMap;
use std::{ffi, io};

type Step<T> = Result<T, ErrorResponse>;

/// Everything a [`Session`] needs to know about its engine, fixed when the
/// session is built.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub program: ffi::OsString,
    pub args: Vec<ffi::OsString>,
    /// The text the engine prints when it is ready for the next command.
    pub prompt: String,
    /// Allow `set-logic` more than once, resetting the engine each time.
    pub relax: bool,
    /// Any reply containing this text is an engine-reported error.
    pub error_marker: String,
    pub name: String,
    pub version: String,
    pub authors: String,
    /// Extra nullary sort renamings on top of `Bool`, `Int` and `Real`.
    pub sorts: Vec<(String, String)>,
    /// Initial values of the session's options.
    pub options: Vec<(String, AttributeValue)>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            program: "yices".into(),
            args: vec!["-i".into()],
            prompt: "yices > ".to_string(),
            relax: false,
            error_marker: "Error".to_string(),
            name: "yices".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            authors: "smt-bridge contributors".to_string(),
            sorts: Vec::new(),
            options: default_options(),
        }
    }
}

fn default_options() -> Vec<(String, AttributeValue)> {
    let flag = |b: bool| AttributeValue::Symbol(b.to_string());
    vec![
        (":print-success".into(), flag(true)),
        (":expand-definitions".into(), flag(false)),
        (":interactive-mode".into(), flag(false)),
        (":produce-proofs".into(), flag(false)),
        (":produce-unsat-cores".into(), flag(false)),
        (":produce-models".into(), flag(false)),
        (":produce-assignments".into(), flag(false)),
        (":regular-output-channel".into(), AttributeValue::Str("stdout".into())),
        (":diagnostic-output-channel".into(), AttributeValue::Str("stderr".into())),
        (":random-seed".into(), AttributeValue::Numeral("0".into())),
        (":verbosity".into(), AttributeValue::Numeral("0".into())),
    ]
}

#[derive(Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    transcript: Option<Box<dyn io::Write + Send>>,
    source: Option<Source>,
}

impl SessionBuilder {
    /// Construct a new builder with the default configuration: `yices -i`
    /// with the `yices > ` prompt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the engine executable and its arguments.
    pub fn solver<P, A>(&mut self, program: P, args: A) -> &mut Self
    where
        P: Into<ffi::OsString>,
        A: IntoIterator,
        A::Item: Into<ffi::OsString>,
    {
        self.config.program = program.into();
        self.config.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn prompt(&mut self, prompt: impl Into<String>) -> &mut Self {
        self.config.prompt = prompt.into();
        self
    }

    /// An optional file (or anything else that is `std::io::Write`-able) where
    /// the whole conversation with the engine is recorded.
    ///
    /// Commands are written as sent and replies as `;` comments, so the
    /// transcript can be replayed against the engine directly.
    ///
    /// By default, there is no transcript.
    pub fn transcript<W>(&mut self, transcript: Option<W>) -> &mut Self
    where
        W: 'static + io::Write + Send,
    {
        self.transcript = transcript.map(|w| Box::new(w) as _);
        self
    }

    pub fn relax(&mut self, relax: bool) -> &mut Self {
        self.config.relax = relax;
        self
    }

    pub fn error_marker(&mut self, marker: impl Into<String>) -> &mut Self {
        self.config.error_marker = marker.into();
        self
    }

    /// Render the nullary sort `smt` as `native` in translated commands.
    pub fn sort(&mut self, smt: impl Into<String>, native: impl Into<String>) -> &mut Self {
        self.config.sorts.push((smt.into(), native.into()));
        self
    }

    /// Override the initial value of an option.
    pub fn option(&mut self, key: impl Into<String>, value: AttributeValue) -> &mut Self {
        let key = key.into();
        self.config.options.retain(|(k, _)| *k != key);
        self.config.options.push((key, value));
        self
    }

    /// The text commands are parsed from, used to give error positions as
    /// lines and columns.
    pub fn source(&mut self, source: Source) -> &mut Self {
        self.source = Some(source);
        self
    }

    /// Finish configuring and build a session backed by an engine subprocess.
    /// The engine is launched by [`Session::start`].
    pub fn build(&mut self) -> Session<ProcessTransport> {
        let transport = ProcessTransport::new(
            self.config.program.clone(),
            self.config.args.clone(),
            self.config.prompt.clone(),
            self.transcript.take().unwrap_or_else(|| Box::new(io::sink())),
        );
        self.build_with(transport)
    }

    /// Finish configuring and build a session over the given transport.
    pub fn build_with<T: Transport>(&mut self, transport: T) -> Session<T> {
        let mut session = Session::new(self.config.clone(), transport);
        session.source = self.source.take();
        session
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    NotStarted,
    Running,
    Exited,
}

/// What a session remembers between commands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub logic_fixed: bool,
    /// Number of scopes the engine has acknowledged pushing and not popped.
    pub scope_depth: usize,
    /// Verdict of the last successful `check-sat`.
    pub last_check: Option<Verdict>,
}

/// An SMT-LIB session driving one engine.
///
/// Every command returns a [`Response`]; failures are reported as
/// [`Response::Error`] and leave the session usable. Commands are strictly
/// sequential: each waits for the engine's reply before returning.
pub struct Session<T: Transport> {
    config: SessionConfig,
    transport: T,
    translator: Translator,
    state: SessionState,
    lifecycle: Lifecycle,
    options: HashMap<String, AttributeValue>,
    source: Option<Source>,
}

impl<T: Transport> Session<T> {
    pub fn new(config: SessionConfig, transport: T) -> Self {
        let translator = config
            .sorts
            .iter()
            .fold(Translator::new(), |tr, (smt, native)| tr.with_sort(smt, native));
        let options = config.options.iter().cloned().collect();
        Session {
            config,
            transport,
            translator,
            state: SessionState::default(),
            lifecycle: Lifecycle::NotStarted,
            options,
            source: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// Replace the text that error positions refer to.
    pub fn set_source(&mut self, source: Option<Source>) {
        self.source = source;
    }

    pub fn execute(&mut self, command: &Command) -> Response {
        match command {
            Command::Assert(expr) => self.assert(expr),
            Command::CheckSat => self.check_sat(),
            Command::DeclareFun { name, args, result } => self.declare_fun(name, args, result),
            Command::DefineFun {
                name,
                params,
                result,
                body,
            } => self.define_fun(name, params, result, body),
            Command::DeclareSort { name, arity } => self.declare_sort(name, *arity),
            Command::DefineSort { name, params, sort } => self.define_sort(name, params, sort),
            Command::Exit => self.exit(),
            Command::GetAssignment => self.get_assignment(),
            Command::GetInfo(key) => self.get_info(key),
            Command::GetOption(key) => self.get_option(key),
            Command::GetProof => self.get_proof(),
            Command::GetUnsatCore => self.get_unsat_core(),
            Command::GetValue(terms) => self.get_value(terms),
            Command::Pop(n) => self.pop(*n),
            Command::Push(n) => self.push(*n),
            Command::SetLogic(logic) => self.set_logic(logic),
            Command::SetOption(key, value) => self.set_option(key, value),
        }
    }

    pub fn start(&mut self) -> Response {
        self.respond("start", |s| {
            match s.lifecycle {
                Lifecycle::NotStarted => {}
                Lifecycle::Running => return Err(ErrorResponse::new("Solver has already been started")),
                Lifecycle::Exited => return Err(ErrorResponse::new("Solver has exited")),
            }
            s.transport
                .start()
                .map_err(|e| ErrorResponse::new(e.to_string()))?;
            s.lifecycle = Lifecycle::Running;
            log::debug!("Started {}", s.config.name);
            Ok(Response::Success)
        })
    }

    /// End the session. The engine is asked to exit and the transport is
    /// closed even if the engine reports an error.
    pub fn exit(&mut self) -> Response {
        self.respond("exit", |s| {
            let was_running = s.is_running();
            s.lifecycle = Lifecycle::Exited;
            if !was_running {
                return Ok(Response::Exited);
            }

            let text = wire(vec![s.atoms().exit.clone()]);
            let sent = s.transport.send_and_listen(&text);
            let closed = s.transport.exit();
            log::debug!("Ended {}", s.config.name);

            let name = s.config.name.clone();
            let fault = |e: TransportError| ErrorResponse::new(format!("Failed to exit {} process: {}", name, e));
            // the engine is not expected to prompt after `(exit)`
            let reply = match sent {
                Err(TransportError::Closed { partial }) => partial,
                other => other.map_err(fault)?,
            };
            closed.map_err(fault)?;
            s.check_reply(reply)?;
            Ok(Response::Exited)
        })
    }

    pub fn assert(&mut self, expr: &Expr) -> Response {
        self.respond("assert", |s| {
            s.require_running()?;
            let term = s.translated(s.translator.expr(expr))?;
            let text = wire(vec![s.atoms().assert.clone(), term]);
            s.transact("assert", &text)?;
            Ok(Response::Success)
        })
    }

    /// Open `n` scopes, one engine command each. The scope depth counts every
    /// push the engine acknowledged, even if a later one fails.
    pub fn push(&mut self, n: usize) -> Response {
        self.respond("push", |s| {
            s.require_running()?;
            let text = wire(vec![s.atoms().push.clone()]);
            for done in 0..n {
                if let Err(e) = s.transact("push", &text) {
                    log::warn!("push stopped after {} of {} scopes", done, n);
                    return Err(e);
                }
                s.state.scope_depth += 1;
            }
            Ok(Response::Success)
        })
    }

    /// Close the `n` innermost scopes. Fails without touching the engine when
    /// fewer than `n` are open.
    pub fn pop(&mut self, n: usize) -> Response {
        self.respond("pop", |s| {
            s.require_running()?;
            if n > s.state.scope_depth {
                return Err(ErrorResponse::new(format!(
                    "Cannot pop {} scope(s): only {} pushed",
                    n, s.state.scope_depth
                )));
            }
            let text = wire(vec![s.atoms().pop.clone()]);
            for done in 0..n {
                if let Err(e) = s.transact("pop", &text) {
                    log::warn!("pop stopped after {} of {} scopes", done, n);
                    return Err(e);
                }
                s.state.scope_depth -= 1;
            }
            Ok(Response::Success)
        })
    }

    pub fn check_sat(&mut self) -> Response {
        self.respond("check-sat", |s| {
            s.require_running()?;
            let text = wire(vec![s.atoms().check.clone()]);
            let reply = s.transact("check-sat", &text)?;
            let verdict = Verdict::from_reply(&reply);
            s.state.last_check = Some(verdict);
            Ok(verdict.into())
        })
    }

    /// Fix the logic. A second `set-logic` is an error unless the session is
    /// relaxed, in which case the engine is reset and all scopes are dropped.
    pub fn set_logic(&mut self, logic: &Symbol) -> Response {
        self.respond("set-logic", |s| {
            s.require_running()?;
            if s.state.logic_fixed {
                if !s.config.relax {
                    return Err(s.error_at("Logic is already set", logic.pos));
                }
                let text = wire(vec![s.atoms().reset.clone()]);
                s.transact("set-logic", &text)
                    .map_err(|e| s.error_at(e.message, logic.pos))?;
                s.state.scope_depth = 0;
                s.state.last_check = None;
                log::debug!("reset {} for logic {}", s.config.name, logic);
            }
            s.state.logic_fixed = true;
            Ok(Response::Success)
        })
    }

    /// Declare `name`. Constants become `(define name::sort)`, functions
    /// `(define name::(-> args... result))`.
    pub fn declare_fun(&mut self, name: &Symbol, args: &[Sort], result: &Sort) -> Response {
        self.respond("declare-fun", |s| {
            s.require_running()?;
            let sort = if args.is_empty() {
                s.translated(s.translator.sort(result))?
            } else {
                s.translated(s.translator.function_sort(args, result))?
            };
            let text = wire(vec![s.atoms().define.clone(), SExpr::typed(&name.name, sort)]);
            s.transact("declare-fun", &text)?;
            Ok(Response::Success)
        })
    }

    pub fn define_fun(
        &mut self,
        name: &Symbol,
        params: &[Declaration],
        result: &Sort,
        body: &Expr,
    ) -> Response {
        self.respond("define-fun", |s| {
            s.require_running()?;
            let body = s.translated(s.translator.expr(body))?;
            let (sort, value) = if params.is_empty() {
                (s.translated(s.translator.sort(result))?, body)
            } else {
                let arg_sorts: Vec<Sort> = params.iter().map(|d| d.sort.clone()).collect();
                let sort = s.translated(s.translator.function_sort(&arg_sorts, result))?;
                let binders = params
                    .iter()
                    .map(|d| s.translator.declaration(d))
                    .collect::<Result<Vec<_>, _>>();
                let binders = s.translated(binders)?;
                let lambda = SExpr::list(vec![s.atoms().lambda.clone(), SExpr::list(binders), body]);
                (sort, lambda)
            };
            let text = wire(vec![
                s.atoms().define.clone(),
                SExpr::typed(&name.name, sort),
                value,
            ]);
            s.transact("define-fun", &text)?;
            Ok(Response::Success)
        })
    }

    /// yices types are structural, so there is nothing to send.
    pub fn declare_sort(&mut self, name: &Symbol, arity: usize) -> Response {
        self.respond("declare-sort", |s| {
            s.require_running()?;
            log::debug!("declare-sort {} (arity {}) is not sent to {}", name, arity, s.config.name);
            Ok(Response::Success)
        })
    }

    /// Checked for translatability but not sent.
    pub fn define_sort(&mut self, name: &Symbol, params: &[Symbol], sort: &Sort) -> Response {
        self.respond("define-sort", |s| {
            s.require_running()?;
            if params.is_empty() {
                s.translated(s.translator.sort(sort))?;
            }
            log::debug!("define-sort {} is not sent to {}", name, s.config.name);
            Ok(Response::Success)
        })
    }

    /// Answered from the session alone; never reaches the engine.
    pub fn get_info(&self, key: &Keyword) -> Response {
        match key.name.as_str() {
            ":error-behavior" => Response::Symbol("continued-execution".into()),
            ":status" => match self.state.last_check {
                Some(verdict) => verdict.into(),
                None => Response::Unsupported,
            },
            ":authors" => Response::Str(self.config.authors.clone()),
            ":version" => Response::Str(self.config.version.clone()),
            ":name" => Response::Str(self.config.name.clone()),
            _ => Response::Unsupported,
        }
    }

    /// Query the values of `terms` in the current model.
    ///
    /// yices answers with one `(= term value)` per term; any other reply shape
    /// yields [`Response::Unsupported`].
    pub fn get_value(&mut self, terms: &[Expr]) -> Response {
        self.respond("get-value", |s| {
            s.require_running()?;
            if terms.is_empty() {
                return Err(ErrorResponse::new("get-value requires at least one term"));
            }
            let rendered = terms
                .iter()
                .map(|t| s.translated(s.translator.expr(t)))
                .collect::<Step<Vec<_>>>()?;

            let head = format!("({}", s.atoms().get_value);
            s.transport.send(&head).map_err(|e| s.fault("get-value", e))?;
            for term in &rendered {
                s.transport
                    .send(&format!(" {}", term))
                    .map_err(|e| s.fault("get-value", e))?;
            }
            let reply = s
                .transport
                .send_and_listen(")")
                .map_err(|e| s.fault("get-value", e))?;
            let reply = s.check_reply(reply)?;
            Ok(read_values(&reply, rendered.len()))
        })
    }

    pub fn get_proof(&mut self) -> Response {
        let atom = self.atoms().get_proof.clone();
        self.forward("get-proof", atom)
    }

    pub fn get_unsat_core(&mut self) -> Response {
        let atom = self.atoms().get_unsat_core.clone();
        self.forward("get-unsat-core", atom)
    }

    pub fn get_assignment(&mut self) -> Response {
        let atom = self.atoms().get_assignment.clone();
        self.forward("get-assignment", atom)
    }

    pub fn get_option(&self, key: &Keyword) -> Response {
        match self.options.get(&key.name) {
            Some(value) => Response::Value(value.clone()),
            None => Response::Unsupported,
        }
    }

    /// Options are kept by the session and not forwarded to the engine.
    pub fn set_option(&mut self, key: &Keyword, value: &AttributeValue) -> Response {
        self.options.insert(key.name.clone(), value.clone());
        Response::Success
    }

    /// Send a query whose answer yices prints in a form we do not read back.
    fn forward(&mut self, command: &str, atom: SExpr) -> Response {
        self.respond(command, |s| {
            s.require_running()?;
            s.transact(command, &wire(vec![atom]))?;
            Ok(Response::Unsupported)
        })
    }

    fn respond(&mut self, command: &str, f: impl FnOnce(&mut Self) -> Step<Response>) -> Response {
        match f(self) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("{} failed: {}", command, e);
                Response::Error(e)
            }
        }
    }

    fn atoms(&self) -> &KnownAtoms {
        self.translator.atoms()
    }

    fn require_running(&self) -> Step<()> {
        match self.lifecycle {
            Lifecycle::Running => Ok(()),
            Lifecycle::NotStarted => Err(ErrorResponse::new("Solver has not been started")),
            Lifecycle::Exited => Err(ErrorResponse::new("Solver has exited")),
        }
    }

    fn error_at(&self, message: impl Into<String>, pos: Option<Pos>) -> ErrorResponse {
        let location = match (pos, &self.source) {
            (Some(pos), Some(source)) => Some(source.locate(pos.start)),
            _ => None,
        };
        ErrorResponse {
            message: message.into(),
            pos,
            location,
        }
    }

    fn translated<U>(&self, result: Result<U, TranslateError>) -> Step<U> {
        result.map_err(|e| self.error_at(e.to_string(), e.pos()))
    }

    fn transact(&mut self, command: &str, text: &str) -> Step<String> {
        let reply = self
            .transport
            .send_and_listen(text)
            .map_err(|e| self.fault(command, e))?;
        self.check_reply(reply)
    }

    /// Report a failed exchange. A fault that leaves the engine unreachable
    /// ends the session.
    fn fault(&mut self, command: &str, e: TransportError) -> ErrorResponse {
        if e.is_fatal() && self.is_running() {
            log::warn!("{} is no longer reachable: {}", self.config.name, e);
            self.lifecycle = Lifecycle::Exited;
            if let Err(close) = self.transport.exit() {
                log::debug!("closing {} failed: {}", self.config.name, close);
            }
        }
        ErrorResponse::new(format!("{} command failed: {}", command, e))
    }

    /// Strip the prompt from a reply and fail if the engine reported an error.
    fn check_reply(&self, reply: String) -> Step<String> {
        let body = reply
            .strip_suffix(self.config.prompt.as_str())
            .unwrap_or(&reply)
            .trim();
        let marker = &self.config.error_marker;
        if !marker.is_empty() && body.contains(marker.as_str()) {
            return Err(ErrorResponse::new(body));
        }
        Ok(body.to_string())
    }
}

fn wire(items: Vec<SExpr>) -> String {
    SExpr::list(items).to_string()
}

/// Pick `(term value)` pairs out of a `get-value` reply, accepting both the
/// yices `(= term value)` lines and the SMT-LIB `((term value) ...)` list.
fn read_values(reply: &str, expected: usize) -> Response {
    let mut parser = Parser::new();
    let exprs = parser.parse(reply);
    if parser.is_pending() {
        return Response::Unsupported;
    }

    let pairs: Option<Vec<(String, String)>> = match exprs.as_slice() {
        [single] if equation_of(single).is_none() => single
            .as_list()
            .and_then(|items| items.iter().map(pair_of).collect()),
        _ => exprs.iter().map(equation_of).collect(),
    };

    match pairs {
        Some(pairs) if pairs.len() == expected => Response::Values(pairs),
        _ => Response::Unsupported,
    }
}

fn pair_of(e: &SExpr) -> Option<(String, String)> {
    match e.as_list()? {
        [term, value] => Some((term.to_string(), value.to_string())),
        _ => None,
    }
}

fn equation_of(e: &SExpr) -> Option<(String, String)> {
    match e.as_list()? {
        [eq, term, value] if eq.as_atom() == Some("=") => Some((term.to_string(), value.to_string())),
        _ => None,
    }
}
