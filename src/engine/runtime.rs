use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::dsl::ast::Stmt;
use crate::dsl::synth::{EntityType, Method, ProgramUnit};
use crate::error::RuntimeError;
use crate::gfx::{DrawLog, DrawingSurface, Gfx, Image, RecordingSurface};
use crate::input::{Input, KeyedInputSource};
use crate::settings::RuntimeConfig;

use super::entity::{Entity, EntityId, EntityRef};
use super::interp::{eval, exec_block, Frame};
use super::registry::Registry;
use super::value::Value;

/// Nested spawn and entity-call depth before a call fails with
/// `RecursionLimit` instead of exhausting the native stack.
pub const MAX_CALL_DEPTH: usize = 32;

struct MainEntry {
    unit: String,
    body: Rc<Vec<Stmt>>,
}

/// One program run: entity types, live entities and the façades scripts
/// draw and read input through. Single-threaded; every method takes `&self`
/// so script code can call back in while the runtime is mid-dispatch.
pub struct Runtime {
    config: RuntimeConfig,
    registry: RefCell<Registry>,
    types: RefCell<IndexMap<String, Rc<EntityType>>>,
    main: RefCell<Option<MainEntry>>,
    gfx: RefCell<Gfx>,
    input: RefCell<Input>,
    images: RefCell<IndexMap<String, Rc<Image>>>,
    next_id: Cell<EntityId>,
    depth: Cell<usize>,
}

/// Holds one level of call depth; released on drop.
struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl Runtime {
    pub fn new(
        config: RuntimeConfig,
        surface: Box<dyn DrawingSurface>,
        input: Option<Box<dyn KeyedInputSource>>,
    ) -> Self {
        Self {
            config,
            registry: RefCell::new(Registry::new()),
            types: RefCell::new(IndexMap::new()),
            main: RefCell::new(None),
            gfx: RefCell::new(Gfx::new(surface)),
            input: RefCell::new(Input::new(input)),
            images: RefCell::new(IndexMap::new()),
            next_id: Cell::new(0),
            depth: Cell::new(0),
        }
    }

    /// Runtime drawing into a `RecordingSurface` sized from the config.
    pub fn headless(config: RuntimeConfig, input: Option<Box<dyn KeyedInputSource>>) -> (Self, DrawLog) {
        let surface = RecordingSurface::new(f64::from(config.width), f64::from(config.height));
        let log = surface.log();
        (Self::new(config, Box::new(surface), input), log)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn gfx(&self) -> RefMut<'_, Gfx> {
        self.gfx.borrow_mut()
    }

    pub(crate) fn input(&self) -> Ref<'_, Input> {
        self.input.borrow()
    }

    // ── Program installation ───────────────────────────────────────

    /// Register a unit's entity types and main entry point. The unit is
    /// already fully resolved, so this cannot fail half-way.
    pub fn install(&self, unit: ProgramUnit) {
        let mut types = self.types.borrow_mut();
        for ty in unit.entities {
            if types.contains_key(&ty.name) {
                warn!(unit = %unit.name, entity = %ty.name, "entity type redefined");
            }
            types.insert(ty.name.clone(), Rc::new(ty));
        }
        drop(types);

        if let Some(body) = unit.main {
            let mut main = self.main.borrow_mut();
            if let Some(prev) = main.as_ref() {
                info!(unit = %unit.name, previous = %prev.unit, "main entry point replaced");
            }
            *main = Some(MainEntry {
                unit: unit.name,
                body: Rc::new(body),
            });
        }
    }

    pub fn has_main(&self) -> bool {
        self.main.borrow().is_some()
    }

    pub fn entity_type_names(&self) -> Vec<String> {
        self.types.borrow().keys().cloned().collect()
    }

    pub fn register_image(&self, name: &str, width: f64, height: f64) {
        self.images.borrow_mut().insert(
            name.to_string(),
            Rc::new(Image {
                name: name.to_string(),
                width,
                height,
            }),
        );
    }

    pub fn image(&self, name: &str) -> Result<Rc<Image>, RuntimeError> {
        self.images
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownImage(name.to_string()))
    }

    /// Run the installed `main` once. Without one this does nothing.
    pub fn run_main(&self) -> Result<(), RuntimeError> {
        let body = match self.main.borrow().as_ref() {
            Some(entry) => Rc::clone(&entry.body),
            None => return Ok(()),
        };
        let mut frame = Frame::new(None);
        exec_block(self, &mut frame, &body)
    }

    // ── Entity lifecycle ───────────────────────────────────────────

    /// Construct an entity, append it to the registry, and return it.
    /// Property initializers run in declaration order, then the `init` body.
    pub fn spawn(&self, type_name: &str, args: Vec<Value>) -> Result<EntityRef, RuntimeError> {
        let ty = self
            .types
            .borrow()
            .get(type_name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownEntityType(type_name.to_string()))?;
        if args.len() != ty.arity() {
            return Err(RuntimeError::ArityMismatch {
                name: type_name.to_string(),
                expected: ty.arity(),
                got: args.len(),
            });
        }

        let _depth = self.enter()?;
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let entity: EntityRef = Rc::new(Entity::new(id, Rc::clone(&ty)));

        // Constructor params are in scope for the initializers too.
        let mut frame = Frame::new(Some(Rc::clone(&entity)));
        for (param, value) in ty.constructor.params.iter().zip(args) {
            frame.define(param, value);
        }
        for init in &ty.initializers {
            let value = match &init.value {
                Some(expr) => eval(self, &mut frame, expr)?,
                None => Value::Unset,
            };
            entity.set(&init.name, value);
        }
        exec_block(self, &mut frame, &ty.constructor.body)?;

        self.registry.borrow_mut().push(Rc::clone(&entity));
        debug!(entity = %ty.name, id, "spawned");
        Ok(entity)
    }

    /// Mark for removal at the start of the next tick phase.
    pub fn destroy(&self, entity: &EntityRef) {
        if !entity.is_destroyed() {
            entity.destroy();
            debug!(entity = %entity.type_name(), id = entity.id(), "destroyed");
        }
    }

    /// Broadcast to every entity in the registry as it stands when the call
    /// starts. Returns how many handlers ran.
    pub fn emit(&self, event: &str, payload: Value) -> Result<usize, RuntimeError> {
        let targets = self.registry.borrow().snapshot();
        let mut delivered = 0;
        for entity in targets {
            let Some(handler) = entity.entity_type().handler(event) else {
                continue;
            };
            let result = self.invoke(&entity, handler, vec![payload.clone()]);
            self.isolate(&entity, "handler", result)?;
            delivered += 1;
        }
        Ok(delivered)
    }

    pub fn entities(&self) -> Vec<EntityRef> {
        self.registry.borrow().snapshot()
    }

    pub fn entity_count(&self) -> usize {
        self.registry.borrow().len()
    }

    // ── Frame phases ───────────────────────────────────────────────

    /// Drain pending key events into the held-key set.
    pub fn pump_input(&self) {
        self.input.borrow_mut().poll();
    }

    /// Remove destroyed entities, then tick the survivors in order.
    /// Entities spawned during the phase first tick next frame.
    pub fn tick_phase(&self, dt: f64) -> Result<(), RuntimeError> {
        let removed = self.registry.borrow_mut().remove_destroyed();
        if removed > 0 {
            debug!(removed, "removed destroyed entities");
        }
        let targets = self.registry.borrow().snapshot();
        for entity in targets {
            let ty = Rc::clone(entity.entity_type());
            let Some(tick) = &ty.tick else {
                continue;
            };
            let result = self.invoke(&entity, tick, vec![Value::Number(dt)]);
            self.isolate(&entity, "tick", result)?;
        }
        Ok(())
    }

    /// Render every live entity in registry order.
    pub fn render_phase(&self) -> Result<(), RuntimeError> {
        let targets = self.registry.borrow().snapshot();
        for entity in targets {
            if entity.is_destroyed() {
                continue;
            }
            let ty = Rc::clone(entity.entity_type());
            let Some(render) = &ty.render else {
                continue;
            };
            let result = self.invoke(&entity, render, Vec::new());
            self.isolate(&entity, "render", result)?;
        }
        Ok(())
    }

    /// Call a method with `this` bound. Missing arguments bind unset; extras are dropped.
    fn invoke(&self, entity: &EntityRef, method: &Method, args: Vec<Value>) -> Result<(), RuntimeError> {
        let _depth = self.enter()?;
        let mut frame = Frame::new(Some(Rc::clone(entity)));
        let mut args = args.into_iter();
        for param in &method.params {
            frame.define(param, args.next().unwrap_or(Value::Unset));
        }
        exec_block(self, &mut frame, &method.body)
    }

    fn enter(&self) -> Result<DepthGuard<'_>, RuntimeError> {
        let depth = self.depth.get();
        if depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::RecursionLimit(MAX_CALL_DEPTH));
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard(&self.depth))
    }

    fn isolate(
        &self,
        entity: &EntityRef,
        phase: &'static str,
        result: Result<(), RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let Err(err) = result else {
            return Ok(());
        };
        if self.config.isolate_entity_errors {
            warn!(
                entity = %entity.type_name(),
                id = entity.id(),
                phase,
                error = %err,
                "entity call failed"
            );
            return Ok(());
        }
        match err {
            RuntimeError::InEntity { .. } => Err(err),
            other => Err(RuntimeError::InEntity {
                entity: entity.type_name().to_string(),
                id: entity.id(),
                phase,
                source: Box::new(other),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::float_cmp, clippy::panic, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use crate::dsl::translate;
    use crate::gfx::DrawCommand;
    use crate::input::SharedKeyQueue;
    use crate::model::{Color, Vector2};

    /// Collects every `collect` event payload as a comma-joined string.
    const LOG: &str = "
entity Log
  prop items = ''
  on 'collect'(v) ->
    this.items = this.items + v + ','
  end
end
";

    fn runtime_with(config: RuntimeConfig, src: &str) -> (Runtime, DrawLog) {
        let (rt, log) = Runtime::headless(config, None);
        rt.install(translate("test.ryx", src).unwrap());
        (rt, log)
    }

    fn runtime(src: &str) -> (Runtime, DrawLog) {
        runtime_with(RuntimeConfig::default(), src)
    }

    fn collected(rt: &Runtime) -> String {
        let log = rt
            .entities()
            .into_iter()
            .find(|e| e.type_name() == "Log")
            .unwrap();
        log.get("items").unwrap().to_string()
    }

    fn names(rt: &Runtime) -> Vec<String> {
        rt.entities().iter().map(|e| e.type_name().to_string()).collect()
    }

    #[test]
    fn initializers_run_in_order_then_init() {
        let src = format!(
            "{LOG}
entity Foo
  prop a = emit('collect', 'a')
  prop b
  state c: number = 3
  init() ->
    emit('collect', 'init')
  end
end
main ->
  spawn(Log)
  spawn(Foo)
end"
        );
        let (rt, _) = runtime(&src);
        rt.run_main().unwrap();
        assert_eq!(collected(&rt), "a,init,");

        let all = rt.entities();
        let foo = &all[1];
        assert_eq!(foo.field_names(), vec!["a", "b", "c"]);
        assert!(foo.get("b").unwrap().is_unset());
        assert!(foo.get("c").unwrap().equals(&Value::Number(3.0)));
    }

    #[test]
    fn default_constructor_binds_unset() {
        let (rt, _) = runtime("entity E\n prop a = 1\n prop b\nend");
        let e = rt.spawn("E", Vec::new()).unwrap();
        assert!(e.get("a").unwrap().equals(&Value::Number(1.0)));
        assert!(e.get("b").unwrap().is_unset());
        assert!(!e.get("b").unwrap().equals(&Value::Number(0.0)));
    }

    #[test]
    fn spawn_appends_after_existing() {
        let src = "
entity X\nend
entity Y\nend
entity Foo
  prop sum
  init(a: number, b: number) ->
    this.sum = a + b
  end
end
main ->
  spawn(X)
  spawn(Y)
  spawn(Foo, 1, 2)
end";
        let (rt, _) = runtime(src);
        rt.run_main().unwrap();
        assert_eq!(names(&rt), vec!["X", "Y", "Foo"]);
        assert!(rt.entities()[2].get("sum").unwrap().equals(&Value::Number(3.0)));
    }

    #[test]
    fn spawn_arity_is_checked() {
        let (rt, _) = runtime("entity Foo\n init(a) ->\n end\nend");
        let err = rt.spawn("Foo", Vec::new()).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::ArityMismatch {
                name: "Foo".into(),
                expected: 1,
                got: 0
            }
        );
        assert_eq!(rt.entity_count(), 0);
        assert!(matches!(
            rt.spawn("Nope", Vec::new()),
            Err(RuntimeError::UnknownEntityType(_))
        ));
    }

    #[test]
    fn emit_reaches_only_handlers() {
        let src = "
entity A\n prop hits = 0\nend
entity B
  prop hits = 0
  prop last
  on 'hit'(amount: number) ->
    this.hits += 1
    this.last = amount
  end
end
entity C\n prop hits = 0\nend";
        let (rt, _) = runtime(src);
        for ty in ["A", "B", "C"] {
            rt.spawn(ty, Vec::new()).unwrap();
        }
        let delivered = rt.emit("hit", Value::Number(7.0)).unwrap();
        assert_eq!(delivered, 1);

        let all = rt.entities();
        assert!(all[0].get("hits").unwrap().equals(&Value::Number(0.0)));
        assert!(all[1].get("hits").unwrap().equals(&Value::Number(1.0)));
        assert!(all[1].get("last").unwrap().equals(&Value::Number(7.0)));
        assert!(all[2].get("hits").unwrap().equals(&Value::Number(0.0)));
    }

    #[test]
    fn handler_without_params_ignores_payload() {
        let src = format!("{LOG}\nentity P\n on 'ping' ->\n  emit('collect', 'pong')\n end\nend");
        let (rt, _) = runtime(&src);
        rt.spawn("Log", Vec::new()).unwrap();
        rt.spawn("P", Vec::new()).unwrap();
        rt.emit("ping", Value::Number(1.0)).unwrap();
        assert_eq!(collected(&rt), "pong,");
    }

    #[test]
    fn destroy_during_tick_skips_render() {
        let src = "
entity Dot
  prop x
  prop doomed = false
  init(x) ->
    this.x = x
  end
  tick ->
    if this.doomed then
      destroy(this)
    end
  end
  render ->
    Gfx::drawCircle(Vector2::new(this.x, 0), 1)
  end
end
main ->
  spawn(Dot, 1)
  let b = spawn(Dot, 2)
  b.doomed = true
  spawn(Dot, 3)
end";
        let (rt, log) = runtime(src);
        rt.run_main().unwrap();

        rt.tick_phase(0.0).unwrap();
        assert_eq!(rt.entity_count(), 3);
        rt.render_phase().unwrap();

        let xs: Vec<f64> = log
            .take()
            .into_iter()
            .filter_map(|c| match c {
                DrawCommand::Circle { x, .. } => Some(x),
                _ => None,
            })
            .collect();
        assert_eq!(xs, vec![1.0, 3.0]);

        rt.tick_phase(0.0).unwrap();
        assert_eq!(rt.entity_count(), 2);
    }

    #[test]
    fn counting_loop_excludes_upper_bound() {
        let src = format!("{LOG}\nmain ->\n spawn(Log)\n loop i from 0 to 3 ->\n  emit('collect', i)\n end\n loop j from 5 to 5 ->\n  emit('collect', 'never')\n end\nend");
        let (rt, _) = runtime(&src);
        rt.run_main().unwrap();
        assert_eq!(collected(&rt), "0,1,2,");
    }

    #[test]
    fn nested_blocks_run_correct_branches() {
        let src = format!(
            "{LOG}
entity E
  init() ->
    loop i from 0 to 4 ->
      if i % 2 == 0 then
        if i == 0 then
          emit('collect', 'zero')
        else
          emit('collect', 'even')
        end
      else if i == 3 then
        emit('collect', 'three')
      else
        emit('collect', 'odd')
      end
    end
  end
end
main ->
  spawn(Log)
  spawn(E)
end"
        );
        let (rt, _) = runtime(&src);
        rt.run_main().unwrap();
        assert_eq!(collected(&rt), "zero,odd,even,three,");
    }

    #[test]
    fn input_vector_through_script() {
        let keys = SharedKeyQueue::new();
        keys.key_down("ArrowUp");
        let (rt, _) = Runtime::headless(RuntimeConfig::default(), Some(Box::new(keys.clone())));
        let src = "
entity Mover
  prop dir
  tick ->
    this.dir = Input::getVector('ArrowLeft', 'ArrowRight', 'ArrowUp', 'ArrowDown')
  end
end";
        rt.install(translate("mover.ryx", src).unwrap());
        let mover = rt.spawn("Mover", Vec::new()).unwrap();

        rt.pump_input();
        rt.tick_phase(0.016).unwrap();
        assert_eq!(mover.get("dir").unwrap().as_vector().unwrap(), Vector2::new(0.0, -1.0));

        keys.key_up("ArrowUp");
        keys.key_down("ArrowLeft");
        keys.key_down("ArrowRight");
        rt.pump_input();
        rt.tick_phase(0.016).unwrap();
        assert_eq!(mover.get("dir").unwrap().as_vector().unwrap(), Vector2::ZERO);
    }

    #[test]
    fn hex_colors_through_script() {
        let src = "
entity Swatch
  prop short = Color::fromHex('#f00')
  prop long = Color::fromHex('#ff0000')
end";
        let (rt, _) = runtime(src);
        let s = rt.spawn("Swatch", Vec::new()).unwrap();
        let red = Color::rgb(255, 0, 0);
        assert_eq!(s.get("short").unwrap().as_color().unwrap(), red);
        assert_eq!(s.get("long").unwrap().as_color().unwrap(), red);
        assert_eq!(red.a, 1.0);
    }

    #[test]
    fn reentrant_emit_uses_snapshot() {
        let src = format!(
            "{LOG}
entity Spawner
  on 'go' ->
    spawn(Late)
    emit('collect', 'spawner')
  end
end
entity Late
  on 'go' ->
    emit('collect', 'late')
  end
end
main ->
  spawn(Log)
  spawn(Spawner)
  emit('go')
end"
        );
        let (rt, _) = runtime(&src);
        rt.run_main().unwrap();
        assert_eq!(collected(&rt), "spawner,");
        assert_eq!(names(&rt), vec!["Log", "Spawner", "Late"]);

        rt.emit("go", Value::Unset).unwrap();
        assert_eq!(collected(&rt), "spawner,spawner,late,");
    }

    #[test]
    fn destroyed_entity_still_hears_broadcast_until_removed() {
        let src = format!("{LOG}\nentity E\n on 'x' ->\n  emit('collect', 'e')\n end\nend");
        let (rt, _) = runtime(&src);
        rt.spawn("Log", Vec::new()).unwrap();
        let e = rt.spawn("E", Vec::new()).unwrap();
        rt.destroy(&e);
        rt.emit("x", Value::Unset).unwrap();
        assert_eq!(collected(&rt), "e,");

        rt.tick_phase(0.0).unwrap();
        rt.emit("x", Value::Unset).unwrap();
        assert_eq!(collected(&rt), "e,");
    }

    #[test]
    fn tick_receives_delta_under_declared_name() {
        let src = "
entity Clock
  prop t = 0
  tick(dt) ->
    this.t += dt
  end
end
entity Default
  prop t = 0
  tick ->
    this.t += delta
  end
end";
        let (rt, _) = runtime(src);
        let a = rt.spawn("Clock", Vec::new()).unwrap();
        let b = rt.spawn("Default", Vec::new()).unwrap();
        rt.tick_phase(0.5).unwrap();
        rt.tick_phase(0.25).unwrap();
        assert!(a.get("t").unwrap().equals(&Value::Number(0.75)));
        assert!(b.get("t").unwrap().equals(&Value::Number(0.75)));
    }

    #[test]
    fn isolated_failure_does_not_stop_others() {
        let src = "
entity Bad
  tick ->
    this.missing += 1
  end
end
entity Good
  prop n = 0
  tick ->
    this.n += 1
  end
end";
        let (rt, _) = runtime(src);
        rt.spawn("Bad", Vec::new()).unwrap();
        let good = rt.spawn("Good", Vec::new()).unwrap();
        rt.tick_phase(0.0).unwrap();
        assert!(good.get("n").unwrap().equals(&Value::Number(1.0)));
    }

    #[test]
    fn strict_mode_aborts_frame_with_entity_context() {
        let config = RuntimeConfig {
            isolate_entity_errors: false,
            ..RuntimeConfig::default()
        };
        let src = "
entity Bad
  tick ->
    this.missing += 1
  end
end
entity Good
  prop n = 0
  tick ->
    this.n += 1
  end
end";
        let (rt, _) = runtime_with(config, src);
        rt.spawn("Bad", Vec::new()).unwrap();
        let good = rt.spawn("Good", Vec::new()).unwrap();
        match rt.tick_phase(0.0).unwrap_err() {
            RuntimeError::InEntity {
                entity,
                phase,
                source,
                ..
            } => {
                assert_eq!(entity, "Bad");
                assert_eq!(phase, "tick");
                assert!(matches!(*source, RuntimeError::UnknownField { .. }));
            }
            other => panic!("expected entity context, got {other:?}"),
        }
        assert!(good.get("n").unwrap().equals(&Value::Number(0.0)));
    }

    #[test]
    fn spawned_during_tick_renders_but_ticks_next_frame() {
        let src = "
entity Parent
  prop done = false
  tick ->
    if !this.done then
      spawn(Child)
      this.done = true
    end
  end
end
entity Child
  prop ticks = 0
  tick ->
    this.ticks += 1
  end
  render ->
    Gfx::drawRect(Vector2::zero(), 1, 1)
  end
end";
        let (rt, log) = runtime(src);
        rt.spawn("Parent", Vec::new()).unwrap();
        rt.tick_phase(0.0).unwrap();
        let child = rt.entities()[1].clone();
        assert!(child.get("ticks").unwrap().equals(&Value::Number(0.0)));
        rt.render_phase().unwrap();
        assert_eq!(log.len(), 1);
        rt.tick_phase(0.0).unwrap();
        assert!(child.get("ticks").unwrap().equals(&Value::Number(1.0)));
    }

    #[test]
    fn later_install_redefines_type() {
        let (rt, _) = runtime("entity E\n prop v = 1\nend");
        rt.install(translate("b.ryx", "entity E\n prop v = 2\nend").unwrap());
        assert_eq!(rt.entity_type_names(), vec!["E".to_string()]);
        let e = rt.spawn("E", Vec::new()).unwrap();
        assert!(e.get("v").unwrap().equals(&Value::Number(2.0)));
    }

    #[test]
    fn images_resolve_by_name() {
        let (rt, log) = runtime(
            "entity Sprite\n render ->\n  Gfx::drawImage(Gfx::image('ship'), Vector2::new(10, 10))\n end\nend",
        );
        rt.register_image("ship", 4.0, 2.0);
        rt.spawn("Sprite", Vec::new()).unwrap();
        rt.render_phase().unwrap();
        assert_eq!(
            log.take(),
            vec![DrawCommand::Image {
                name: "ship".into(),
                x: 8.0,
                y: 9.0,
                width: 4.0,
                height: 2.0
            }]
        );
        assert!(matches!(rt.image("nope"), Err(RuntimeError::UnknownImage(_))));
    }

    #[test]
    fn initializers_see_constructor_params() {
        let src = "
entity P
  prop x = start
  prop doubled = start * 2
  init(start: number) ->
    this.x += 1
  end
end";
        let (rt, _) = runtime(src);
        let p = rt.spawn("P", vec![Value::Number(5.0)]).unwrap();
        assert!(p.get("x").unwrap().equals(&Value::Number(6.0)));
        assert!(p.get("doubled").unwrap().equals(&Value::Number(10.0)));
    }

    const ECHO: &str = "
entity Echo
  prop n = 0
  on 'ping' ->
    this.n += 1
    emit('ping')
  end
end";

    #[test]
    fn runaway_emit_hits_depth_limit_and_is_isolated() {
        let (rt, _) = runtime(ECHO);
        let echo = rt.spawn("Echo", Vec::new()).unwrap();
        assert_eq!(rt.emit("ping", Value::Unset).unwrap(), 1);
        assert!(echo
            .get("n")
            .unwrap()
            .equals(&Value::Number(MAX_CALL_DEPTH as f64)));

        // Depth is released once the chain unwinds.
        assert_eq!(rt.emit("ping", Value::Unset).unwrap(), 1);
        assert!(echo
            .get("n")
            .unwrap()
            .equals(&Value::Number(2.0 * MAX_CALL_DEPTH as f64)));
    }

    #[test]
    fn runaway_emit_in_strict_mode_reports_limit() {
        let config = RuntimeConfig {
            isolate_entity_errors: false,
            ..RuntimeConfig::default()
        };
        let (rt, _) = runtime_with(config, ECHO);
        rt.spawn("Echo", Vec::new()).unwrap();
        match rt.emit("ping", Value::Unset).unwrap_err() {
            RuntimeError::InEntity { entity, source, .. } => {
                assert_eq!(entity, "Echo");
                assert_eq!(*source, RuntimeError::RecursionLimit(MAX_CALL_DEPTH));
            }
            other => panic!("expected entity context, got {other:?}"),
        }
    }

    #[test]
    fn self_spawning_init_fails_without_registering() {
        let (rt, _) = runtime("entity Loop
 init() ->
  spawn(Loop)
 end
end");
        assert_eq!(
            rt.spawn("Loop", Vec::new()).unwrap_err(),
            RuntimeError::RecursionLimit(MAX_CALL_DEPTH)
        );
        assert_eq!(rt.entity_count(), 0);
        rt.install(translate("ok.ryx", "entity Ok
end").unwrap());
        assert!(rt.spawn("Ok", Vec::new()).is_ok());
    }
}
